//! Realtime core components for the hub runtime.
//!
//! Connection registry, presence fan-out, and the egress runtime/context
//! shared across services.

mod presence;
mod realtime;
mod registry;

pub use presence::Presence;
pub use realtime::{RealtimeCore, RealtimeCtx};
pub use registry::{BroadcastReport, Connection, ConnectionRegistry};
