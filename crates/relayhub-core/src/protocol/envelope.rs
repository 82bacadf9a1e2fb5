//! Envelope (JSON text frame).
//!
//! `payload` is stored as `RawValue` so only the handler selected by `type`
//! pays for parsing it.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::value::RawValue;

use crate::error::{RelayError, Result};

/// `{"type": ..., "payload": ...}` as received on the wire.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    /// Variant discriminant (field name is `type` in JSON).
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Optional payload, stored as raw JSON (lazy parsing).
    #[serde(default)]
    pub payload: Option<Box<RawValue>>,
}

impl Envelope {
    /// Parse the envelope header only.
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| RelayError::BadRequest(format!("invalid envelope json: {e}")))
    }

    /// Raw payload text, `null` when absent.
    pub fn payload_str(&self) -> &str {
        self.payload.as_deref().map(RawValue::get).unwrap_or("null")
    }

    /// Decode the payload into the type chosen by the caller.
    pub fn decode_payload<T: DeserializeOwned>(&self) -> Result<T> {
        let raw = self.payload.as_deref().ok_or_else(|| {
            RelayError::BadRequest(format!("{} requires payload", self.msg_type))
        })?;
        serde_json::from_str(raw.get())
            .map_err(|e| RelayError::BadRequest(format!("{} invalid payload: {e}", self.msg_type)))
    }
}
