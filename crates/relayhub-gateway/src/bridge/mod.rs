//! Client-side bridge: local WebSocket surface, per-session relay to the hub,
//! and the health cascade.

pub mod backoff;
pub mod health;
pub mod http;
pub mod relay;
pub mod server;

pub use backoff::Backoff;
pub use health::{HealthCascade, HealthReport, Probe};
pub use relay::{BridgeRelay, RelayOutcome, RelayParams, RelaySettings, RelayState};
pub use server::{build_router, BridgeState};
