//! Events sent towards the client (hub → bridge → GUI, or bridge → GUI).
//!
//! Serialized with adjacent tagging so every event lands on the wire as the
//! same `{"type": ..., "payload": ...}` envelope the client sends.

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

use super::model::{CallPhase, CallSignal, ChatMessage, ConnectionStatus, PresenceEvent};

/// `message_read` payload, delivered to the original sender only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadNotice {
    pub message_id: String,
    pub read_by: String,
}

/// `connection_status` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusNotice {
    pub status: ConnectionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    #[serde(rename = "new_message")]
    NewMessage(ChatMessage),
    #[serde(rename = "message_sent")]
    MessageSent(ChatMessage),
    #[serde(rename = "message_read")]
    MessageRead(ReadNotice),
    #[serde(rename = "user_status")]
    UserStatus(PresenceEvent),
    #[serde(rename = "call-offer")]
    CallOffer(CallSignal),
    #[serde(rename = "call-answer")]
    CallAnswer(CallSignal),
    #[serde(rename = "ice-candidate")]
    IceCandidate(CallSignal),
    #[serde(rename = "call-end")]
    CallEnd(CallSignal),
    #[serde(rename = "connection_status")]
    ConnectionStatus(StatusNotice),
    /// Terminal: the bridge gave up reconnecting.
    #[serde(rename = "connection_lost")]
    ConnectionLost,
}

impl Event {
    pub fn call(phase: CallPhase, signal: CallSignal) -> Self {
        match phase {
            CallPhase::Offer => Event::CallOffer(signal),
            CallPhase::Answer => Event::CallAnswer(signal),
            CallPhase::Ice => Event::IceCandidate(signal),
            CallPhase::End => Event::CallEnd(signal),
        }
    }

    pub fn status(status: ConnectionStatus) -> Self {
        Event::ConnectionStatus(StatusNotice { status })
    }

    /// Wire name (`type`) of the event.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::NewMessage(_) => "new_message",
            Event::MessageSent(_) => "message_sent",
            Event::MessageRead(_) => "message_read",
            Event::UserStatus(_) => "user_status",
            Event::CallOffer(_) => CallPhase::Offer.as_wire(),
            Event::CallAnswer(_) => CallPhase::Answer.as_wire(),
            Event::IceCandidate(_) => CallPhase::Ice.as_wire(),
            Event::CallEnd(_) => CallPhase::End.as_wire(),
            Event::ConnectionStatus(_) => "connection_status",
            Event::ConnectionLost => "connection_lost",
        }
    }

    /// Serialize once; the result can be fanned out to many sockets.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| RelayError::Internal(format!("json encode failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use serde_json::{json, Value};

    use super::*;
    use crate::protocol::model::PresenceStatus;

    #[test]
    fn events_use_type_payload_shape() {
        let ev = Event::UserStatus(PresenceEvent {
            user_id: "A".into(),
            status: PresenceStatus::Offline,
        });
        let v: Value = serde_json::from_str(&ev.to_json().unwrap()).unwrap();
        assert_eq!(
            v,
            json!({"type": "user_status", "payload": {"userId": "A", "status": "offline"}})
        );
    }

    #[test]
    fn status_and_lost_events() {
        let v: Value = serde_json::from_str(
            &Event::status(ConnectionStatus::TsnetDisconnected).to_json().unwrap(),
        )
        .unwrap();
        assert_eq!(v["type"], "connection_status");
        assert_eq!(v["payload"]["status"], "tsnet_disconnected");

        let lost = Event::ConnectionLost.to_json().unwrap();
        let back: Event = serde_json::from_str(&lost).unwrap();
        assert_eq!(back, Event::ConnectionLost);
        assert_eq!(back.kind(), "connection_lost");
    }

    #[test]
    fn call_event_stamps_wire_name() {
        let signal = CallSignal {
            call_id: Some("c1".into()),
            from_id: Some("A".into()),
            to_id: "B".into(),
            data: serde_json::Map::new(),
        };
        let ev = Event::call(CallPhase::Answer, signal);
        let v: Value = serde_json::from_str(&ev.to_json().unwrap()).unwrap();
        assert_eq!(v["type"], "call-answer");
        assert_eq!(v["payload"]["fromId"], "A");
        assert_eq!(v["payload"]["callId"], "c1");
    }
}
