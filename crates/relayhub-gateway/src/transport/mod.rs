//! Transport layer (WebSocket).
//!
//! Exposes the hub's WS upgrade handler, the codec that decodes frames once
//! before they reach the dispatcher, and the per-socket writer/keepalive tasks
//! shared with the bridge's local surface.

pub mod codec;
pub mod socket;
pub mod ws;
