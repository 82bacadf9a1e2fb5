//! Config loaders (strict parsing) for the hub and the bridge.

pub mod bridge;
pub mod hub;

use std::fs;

use relayhub_core::error::{RelayError, Result};

pub use bridge::{BackoffSection, BridgeConfig, BridgeSection, HealthSection};
pub use hub::{AccountConfig, AuthMode, AuthSection, HubConfig, HubSection};

pub fn load_hub_from_file(path: &str) -> Result<HubConfig> {
    load_hub_from_str(&read(path)?)
}

pub fn load_hub_from_str(s: &str) -> Result<HubConfig> {
    let cfg: HubConfig = serde_yaml::from_str(s)
        .map_err(|e| RelayError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_bridge_from_file(path: &str) -> Result<BridgeConfig> {
    load_bridge_from_str(&read(path)?)
}

pub fn load_bridge_from_str(s: &str) -> Result<BridgeConfig> {
    let cfg: BridgeConfig = serde_yaml::from_str(s)
        .map_err(|e| RelayError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

fn read(path: &str) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| RelayError::Internal(format!("read config {path} failed: {e}")))
}
