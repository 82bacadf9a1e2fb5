//! Wire protocol shared by every hop (client ⇄ bridge ⇄ hub).
//!
//! - `envelope`: the `{type, payload}` unit, payload kept as raw JSON until the
//!   discriminant is known.
//! - `inbound`: typed decode of client → hub envelopes.
//! - `event`: hub/bridge → client events, serialized back into envelopes.
//! - `model`: the relayed data model (messages, call signals, presence).
//!
//! Decoding is panic-free: malformed input is a `RelayError` value, and unknown
//! `type` values decode to `Inbound::Unknown` instead of failing.

pub mod envelope;
pub mod event;
pub mod inbound;
pub mod model;

pub use envelope::Envelope;
pub use event::{Event, ReadNotice, StatusNotice};
pub use inbound::{Inbound, ReadReceipt, SendMessage};
pub use model::{
    CallPhase, CallSignal, ChatMessage, ConnectionStatus, ConversationKey, PresenceEvent,
    PresenceStatus,
};
