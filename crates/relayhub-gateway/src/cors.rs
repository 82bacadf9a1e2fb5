//! Origin allowlist shared by the hub and the bridge.
//!
//! Only plain-http loopback origins (`localhost`, `wails.localhost`,
//! `127.0.0.1`, with or without a port) get CORS headers. Other origins are
//! served without them, so browsers refuse to expose the response.

use std::time::Duration;

use axum::http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

pub const ALLOWED_ORIGINS: [&str; 3] = [
    "http://localhost",
    "http://wails.localhost",
    "http://127.0.0.1",
];

const MAX_AGE: Duration = Duration::from_secs(86400);

/// Exact match, or an allowed origin followed by `:<port>`.
pub fn is_allowed_origin(origin: &str) -> bool {
    ALLOWED_ORIGINS.iter().any(|allowed| match origin.strip_prefix(allowed) {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix(':')
            .is_some_and(|port| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())),
        None => false,
    })
}

pub fn layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin: &HeaderValue, _| {
            origin.to_str().is_ok_and(is_allowed_origin)
        }))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(MAX_AGE)
}
