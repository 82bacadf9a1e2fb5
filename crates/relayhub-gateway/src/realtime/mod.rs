//! Realtime runtime (egress engine) shared by the hub and the bridge's local
//! surface.

pub mod core;
pub mod types;

pub use self::core::{BroadcastReport, Connection, ConnectionRegistry, Presence, RealtimeCore, RealtimeCtx};
pub use types::{Delivery, PreparedMsg};
