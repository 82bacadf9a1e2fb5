//! Typed decode of client → hub envelopes.
//!
//! The discriminant is read first; the payload is parsed only for the variant
//! it selects. Unknown types are kept as `Inbound::Unknown` so newer clients
//! never break an older hub.

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

use super::envelope::Envelope;
use super::model::{CallPhase, CallSignal};

/// `message` payload. A client-supplied `fromId` is ignored; the hub stamps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    pub to_id: String,
    pub content: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
}

fn default_kind() -> String {
    "text".into()
}

/// `read` payload: `other_id` is the original sender of `message_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceipt {
    pub message_id: String,
    pub other_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// A decoded client → hub envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Message(SendMessage),
    Read(ReadReceipt),
    Call(CallPhase, CallSignal),
    Disconnect,
    /// Application-level ping, ignored by the hub.
    Ping,
    /// Forward-compatible catch-all, carries the unrecognised `type`.
    Unknown(String),
}

impl Inbound {
    /// Decode a text frame: header first, then the selected payload.
    pub fn decode(text: &str) -> Result<Self> {
        let env = Envelope::parse(text)?;
        Self::from_envelope(&env)
    }

    pub fn from_envelope(env: &Envelope) -> Result<Self> {
        if let Some(phase) = CallPhase::from_wire(&env.msg_type) {
            let signal: CallSignal = env.decode_payload()?;
            require_id("toId", &signal.to_id)?;
            return Ok(Inbound::Call(phase, signal));
        }

        match env.msg_type.as_str() {
            "message" => {
                let req: SendMessage = env.decode_payload()?;
                require_id("toId", &req.to_id)?;
                Ok(Inbound::Message(req))
            }
            "read" => {
                let receipt: ReadReceipt = env.decode_payload()?;
                require_id("messageId", &receipt.message_id)?;
                require_id("otherId", &receipt.other_id)?;
                Ok(Inbound::Read(receipt))
            }
            "disconnect" => Ok(Inbound::Disconnect),
            "ping" => Ok(Inbound::Ping),
            other => Ok(Inbound::Unknown(other.to_string())),
        }
    }

    /// Wire name of the variant, for logging.
    pub fn kind(&self) -> &str {
        match self {
            Inbound::Message(_) => "message",
            Inbound::Read(_) => "read",
            Inbound::Call(phase, _) => phase.as_wire(),
            Inbound::Disconnect => "disconnect",
            Inbound::Ping => "ping",
            Inbound::Unknown(t) => t,
        }
    }
}

fn require_id(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RelayError::BadRequest(format!("{field} must not be empty")));
    }
    Ok(())
}
