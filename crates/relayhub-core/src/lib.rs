//! relayhub core: transport-agnostic protocol primitives and the shared error type.
//!
//! This crate defines the wire-level contracts exchanged at every hop
//! (client ⇄ bridge ⇄ hub) and the error surface shared by the hub and the
//! bridge. It intentionally carries no transport or runtime dependencies.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Every fallible path
//! surfaces as `RelayError`/`Result` so a malformed frame never takes a
//! connection (or the process) down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{RelayError, Result};
