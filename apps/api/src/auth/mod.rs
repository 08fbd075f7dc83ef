pub mod password;
pub mod service;

pub use service::AuthService;
