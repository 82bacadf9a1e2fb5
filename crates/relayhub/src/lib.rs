//! Top-level facade crate for relayhub.
//!
//! `protocol` is the wire format shared by every hop, `hub` the server side,
//! `bridge` the client side. The full gateway library stays reachable as
//! `gateway`.

pub use relayhub_core::{RelayError, Result};
pub use relayhub_gateway as gateway;

pub mod protocol {
    pub use relayhub_core::protocol::*;
}

pub mod hub {
    pub use relayhub_gateway::app_state::AppState;
    pub use relayhub_gateway::config::{load_hub_from_file, load_hub_from_str, HubConfig};
    pub use relayhub_gateway::router::build_router;
    pub use relayhub_gateway::store::{MemoryStore, MessageStore};
}

pub mod bridge {
    pub use relayhub_gateway::bridge::*;
    pub use relayhub_gateway::config::{load_bridge_from_file, load_bridge_from_str, BridgeConfig};
}
