//! Decode-once codec for the transport layer.
//!
//! - Text frames => `Inbound` (header first, payload only for the selected variant)
//! - Ping/Pong only refresh liveness; the socket layer answers pings itself
//! - Close is surfaced for lifecycle management
//! - Binary frames are not part of the protocol

use axum::extract::ws::Message;
use relayhub_core::{
    error::{RelayError, Result},
    protocol::Inbound,
};

#[derive(Debug)]
pub enum Frame {
    Envelope(Inbound),
    Control,
    Close,
}

pub fn decode(msg: Message) -> Result<Frame> {
    match msg {
        Message::Text(s) => Ok(Frame::Envelope(Inbound::decode(&s)?)),
        Message::Binary(b) => Err(RelayError::BadRequest(format!(
            "binary frames are not supported ({} bytes)",
            b.len()
        ))),
        Message::Ping(_) | Message::Pong(_) => Ok(Frame::Control),
        Message::Close(_) => Ok(Frame::Close),
    }
}
