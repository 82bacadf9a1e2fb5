//! Built-in hub services.

pub mod call;
pub mod chat;

pub use call::CallService;
pub use chat::ChatService;
