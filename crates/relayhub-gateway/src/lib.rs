//! relayhub gateway library entry.
//!
//! Hub side: transport, dispatcher, realtime core (registry + presence), and
//! the HTTP read API. Client side: the bridge's local surface, per-session
//! relay, and health cascade. Both binaries and the integration tests build
//! on this crate.

pub mod app_state;
pub mod auth;
pub mod bridge;
pub mod config;
pub mod cors;
pub mod dispatch;
pub mod error;
pub mod ops;
pub mod overlay;
pub mod realtime;
pub mod router;
pub mod services;
pub mod shutdown;
pub mod store;
pub mod transport;
