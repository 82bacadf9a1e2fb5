use axum::extract::ws::Message;

use relayhub_core::error::Result;
use relayhub_core::protocol::Event;

/// Prepared message cached for fan-out (serialize once, send N times).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedMsg(String);

impl PreparedMsg {
    pub fn prepare(ev: &Event) -> Result<Self> {
        Ok(Self(ev.to_json()?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to axum::ws::Message for transport.
    pub fn to_ws_message(&self) -> Message {
        Message::Text(self.0.clone())
    }
}

/// Outcome of a single-recipient send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued on the recipient's socket.
    Queued,
    /// No live session; dropped silently.
    Offline,
    /// The recipient did not accept within the send deadline and was torn down.
    Failed,
}
