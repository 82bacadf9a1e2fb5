use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;
use relayhub_core::error::{RelayError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HubConfig {
    pub version: u32,

    #[serde(default)]
    pub hub: HubSection,

    #[serde(default)]
    pub auth: AuthSection,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            version: 1,
            hub: HubSection::default(),
            auth: AuthSection::default(),
        }
    }
}

impl HubConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(RelayError::UnsupportedVersion);
        }
        self.hub.validate()?;
        self.auth.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HubSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    /// Reset on every received frame; expiry tears the session down.
    #[serde(default = "default_read_deadline_ms")]
    pub read_deadline_ms: u64,

    /// Per-peer deadline for a single outbound send (presence fan-out, relay).
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,

    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,

    #[serde(default = "default_user_name")]
    pub default_user_name: String,
}

impl Default for HubSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            ping_interval_ms: default_ping_interval_ms(),
            read_deadline_ms: default_read_deadline_ms(),
            send_timeout_ms: default_send_timeout_ms(),
            outbound_queue: default_outbound_queue(),
            default_user_name: default_user_name(),
        }
    }
}

impl HubSection {
    pub fn validate(&self) -> Result<()> {
        if !(1000..=120000).contains(&self.ping_interval_ms) {
            return Err(RelayError::BadRequest(
                "hub.ping_interval_ms must be between 1000 and 120000".into(),
            ));
        }
        if self.read_deadline_ms > 600000 {
            return Err(RelayError::BadRequest(
                "hub.read_deadline_ms must be at most 600000".into(),
            ));
        }
        if self.read_deadline_ms <= self.ping_interval_ms {
            return Err(RelayError::BadRequest(
                "hub.read_deadline_ms must be greater than ping_interval_ms".into(),
            ));
        }
        if !(100..=30000).contains(&self.send_timeout_ms) {
            return Err(RelayError::BadRequest(
                "hub.send_timeout_ms must be between 100 and 30000".into(),
            ));
        }
        if self.outbound_queue < 16 {
            return Err(RelayError::BadRequest("hub.outbound_queue must be >= 16".into()));
        }
        Ok(())
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn read_deadline(&self) -> Duration {
        Duration::from_millis(self.read_deadline_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_ping_interval_ms() -> u64 {
    30000
}
fn default_read_deadline_ms() -> u64 {
    120000
}
fn default_send_timeout_ms() -> u64 {
    1500
}
fn default_outbound_queue() -> usize {
    1024
}
fn default_user_name() -> String {
    "anonymous".into()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Any non-empty credential authenticates as itself.
    #[default]
    Open,
    /// Only tokens listed under `auth.accounts`.
    Accounts,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthSection {
    #[serde(default)]
    pub mode: AuthMode,

    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

impl AuthSection {
    pub fn validate(&self) -> Result<()> {
        if self.mode == AuthMode::Accounts && self.accounts.is_empty() {
            return Err(RelayError::BadRequest(
                "auth.accounts must not be empty when auth.mode is accounts".into(),
            ));
        }
        let mut tokens = HashSet::new();
        for a in &self.accounts {
            if a.id.trim().is_empty() || a.token.is_empty() {
                return Err(RelayError::BadRequest(
                    "auth.accounts entries need a non-empty id and token".into(),
                ));
            }
            if !tokens.insert(a.token.as_str()) {
                return Err(RelayError::BadRequest(format!(
                    "auth.accounts token for {} is not unique",
                    a.id
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountConfig {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub token: String,
}
