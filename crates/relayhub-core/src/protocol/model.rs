//! Relayed data model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::inbound::SendMessage;

/// Separator used when a conversation key is displayed.
pub const CONVERSATION_KEY_SEPARATOR: char = ':';

/// A chat message as relayed (not as stored).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub from_id: String,
    pub to_id: String,
    pub content: String,
    /// `text`, `image`, `file`, ... (field name is `type` in JSON).
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

impl ChatMessage {
    /// Build the relayed message: id and timestamp are assigned here, at the hub.
    pub fn stamp(from_id: &str, req: SendMessage) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            from_id: from_id.to_string(),
            to_id: req.to_id,
            content: req.content,
            kind: req.kind,
            timestamp: Utc::now(),
            read: false,
        }
    }

    pub fn conversation_key(&self) -> ConversationKey {
        ConversationKey::new(&self.from_id, &self.to_id)
    }
}

/// Room key shared by both participants, independent of who initiated.
///
/// Held as the ordered pair of ids, so ids containing the display separator
/// can never collide with another pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationKey {
    lo: String,
    hi: String,
}

impl ConversationKey {
    pub fn new(a: &str, b: &str) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Self {
            lo: lo.to_string(),
            hi: hi.to_string(),
        }
    }

    pub fn participants(&self) -> (&str, &str) {
        (&self.lo, &self.hi)
    }

    /// True when `msg` was exchanged between exactly these two users.
    pub fn covers(&self, msg: &ChatMessage) -> bool {
        *self == msg.conversation_key()
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{CONVERSATION_KEY_SEPARATOR}{}", self.lo, self.hi)
    }
}

/// Call-signaling phase. The hub keeps no state machine for these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    Offer,
    Answer,
    Ice,
    End,
}

impl CallPhase {
    pub fn from_wire(msg_type: &str) -> Option<Self> {
        match msg_type {
            "call-offer" => Some(CallPhase::Offer),
            "call-answer" => Some(CallPhase::Answer),
            "ice-candidate" => Some(CallPhase::Ice),
            "call-end" => Some(CallPhase::End),
            _ => None,
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            CallPhase::Offer => "call-offer",
            CallPhase::Answer => "call-answer",
            CallPhase::Ice => "ice-candidate",
            CallPhase::End => "call-end",
        }
    }
}

/// Call signal payload. Everything except the routing ids is carried through
/// untouched in `data` (sdp, candidate, media type, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSignal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_id: Option<String>,
    pub to_id: String,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Offline,
}

impl PresenceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PresenceStatus::Online => "online",
            PresenceStatus::Offline => "offline",
        }
    }
}

/// Online/offline transition. Broadcast only, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEvent {
    pub user_id: String,
    pub status: PresenceStatus,
}

/// Composite connection status reported by the bridge's health cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    LocalDisconnected,
    TsnetDisconnected,
    ServerDisconnected,
}

impl ConnectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::LocalDisconnected => "local_disconnected",
            ConnectionStatus::TsnetDisconnected => "tsnet_disconnected",
            ConnectionStatus::ServerDisconnected => "server_disconnected",
        }
    }
}
