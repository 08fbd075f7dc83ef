// Participant flow: song ordering, per-session progress, answer recording
// and the HTTP handlers that drive them. Handlers stay thin; every state
// change goes through `actions`.

pub mod actions;
pub mod handlers;
pub mod progress;
pub mod recorder;
pub mod registry;
pub mod selector;
pub mod session;
