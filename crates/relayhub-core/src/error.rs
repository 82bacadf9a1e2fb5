//! Shared error type across relayhub crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed message.
    BadRequest,
    /// Auth failed.
    AuthFailed,
    /// Referenced entity does not exist.
    NotFound,
    /// Overlay or socket level failure.
    Transport,
    /// Persistence collaborator failure.
    Store,
    /// Deadline elapsed.
    Timeout,
    /// Unsupported config/protocol version.
    UnsupportedVersion,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::AuthFailed => "AUTH_FAILED",
            ClientCode::NotFound => "NOT_FOUND",
            ClientCode::Transport => "TRANSPORT",
            ClientCode::Store => "STORE",
            ClientCode::Timeout => "TIMEOUT",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("auth failed")]
    AuthFailed,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("transport: {0}")]
    Transport(String),
    #[error("store: {0}")]
    Store(String),
    #[error("timeout")]
    Timeout,
    #[error("unsupported version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl RelayError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            RelayError::BadRequest(_) => ClientCode::BadRequest,
            RelayError::AuthFailed => ClientCode::AuthFailed,
            RelayError::NotFound(_) => ClientCode::NotFound,
            RelayError::Transport(_) => ClientCode::Transport,
            RelayError::Store(_) => ClientCode::Store,
            RelayError::Timeout => ClientCode::Timeout,
            RelayError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            RelayError::Internal(_) => ClientCode::Internal,
        }
    }

    /// Transient errors are retried by the bridge; everything else is final.
    pub fn is_transient(&self) -> bool {
        matches!(self, RelayError::Transport(_) | RelayError::Timeout)
    }
}
