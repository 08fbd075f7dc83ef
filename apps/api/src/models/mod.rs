pub mod response;
pub mod song;
pub mod user;
