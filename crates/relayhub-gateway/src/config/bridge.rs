use std::time::Duration;

use serde::Deserialize;
use relayhub_core::error::{RelayError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    pub version: u32,

    #[serde(default)]
    pub bridge: BridgeSection,

    #[serde(default)]
    pub backoff: BackoffSection,

    #[serde(default)]
    pub health: HealthSection,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            version: 1,
            bridge: BridgeSection::default(),
            backoff: BackoffSection::default(),
            health: HealthSection::default(),
        }
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(RelayError::UnsupportedVersion);
        }
        self.bridge.validate()?;
        self.backoff.validate()?;
        self.health.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeSection {
    /// Loopback address the GUI talks to.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Hub `host:port` on the overlay network.
    #[serde(default = "default_hub_addr")]
    pub hub_addr: String,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Upper bound on a single upstream write; a stalled write means the
    /// upstream is gone.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    #[serde(default = "default_local_queue")]
    pub local_queue: usize,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            hub_addr: default_hub_addr(),
            ping_interval_ms: default_ping_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
            local_queue: default_local_queue(),
        }
    }
}

impl BridgeSection {
    pub fn validate(&self) -> Result<()> {
        if self.hub_addr.rsplit_once(':').map_or(true, |(host, port)| {
            host.is_empty() || port.parse::<u16>().is_err()
        }) {
            return Err(RelayError::BadRequest(
                "bridge.hub_addr must be host:port".into(),
            ));
        }
        if !(1000..=120000).contains(&self.ping_interval_ms) {
            return Err(RelayError::BadRequest(
                "bridge.ping_interval_ms must be between 1000 and 120000".into(),
            ));
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            return Err(RelayError::BadRequest(
                "bridge.idle_timeout_ms must be greater than ping_interval_ms".into(),
            ));
        }
        if !(100..=60000).contains(&self.write_timeout_ms) {
            return Err(RelayError::BadRequest(
                "bridge.write_timeout_ms must be between 100 and 60000".into(),
            ));
        }
        if self.local_queue < 16 {
            return Err(RelayError::BadRequest("bridge.local_queue must be >= 16".into()));
        }
        Ok(())
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

fn default_listen() -> String {
    "127.0.0.1:9000".into()
}
fn default_hub_addr() -> String {
    "chat-server:8080".into()
}
fn default_ping_interval_ms() -> u64 {
    30000
}
fn default_idle_timeout_ms() -> u64 {
    120000
}
fn default_write_timeout_ms() -> u64 {
    10000
}
fn default_local_queue() -> usize {
    256
}

/// Reconnect schedule: attempt `i` waits `i * base_ms`, capped at `cap_ms`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackoffSection {
    #[serde(default = "default_base_ms")]
    pub base_ms: u64,
    #[serde(default = "default_cap_ms")]
    pub cap_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for BackoffSection {
    fn default() -> Self {
        Self {
            base_ms: default_base_ms(),
            cap_ms: default_cap_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl BackoffSection {
    pub fn validate(&self) -> Result<()> {
        if !(100..=60000).contains(&self.base_ms) {
            return Err(RelayError::BadRequest(
                "backoff.base_ms must be between 100 and 60000".into(),
            ));
        }
        if self.cap_ms < self.base_ms {
            return Err(RelayError::BadRequest(
                "backoff.cap_ms must be >= backoff.base_ms".into(),
            ));
        }
        if !(1..=20).contains(&self.max_attempts) {
            return Err(RelayError::BadRequest(
                "backoff.max_attempts must be between 1 and 20".into(),
            ));
        }
        Ok(())
    }
}

fn default_base_ms() -> u64 {
    2000
}
fn default_cap_ms() -> u64 {
    10000
}
fn default_max_attempts() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthSection {
    #[serde(default = "default_health_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_local_timeout_ms")]
    pub local_timeout_ms: u64,
    #[serde(default = "default_overlay_timeout_ms")]
    pub overlay_timeout_ms: u64,
    #[serde(default = "default_application_timeout_ms")]
    pub application_timeout_ms: u64,
}

impl Default for HealthSection {
    fn default() -> Self {
        Self {
            interval_ms: default_health_interval_ms(),
            local_timeout_ms: default_local_timeout_ms(),
            overlay_timeout_ms: default_overlay_timeout_ms(),
            application_timeout_ms: default_application_timeout_ms(),
        }
    }
}

impl HealthSection {
    pub fn validate(&self) -> Result<()> {
        if !(500..=60000).contains(&self.interval_ms) {
            return Err(RelayError::BadRequest(
                "health.interval_ms must be between 500 and 60000".into(),
            ));
        }
        for (name, v) in [
            ("local_timeout_ms", self.local_timeout_ms),
            ("overlay_timeout_ms", self.overlay_timeout_ms),
            ("application_timeout_ms", self.application_timeout_ms),
        ] {
            if !(50..=30000).contains(&v) {
                return Err(RelayError::BadRequest(format!(
                    "health.{name} must be between 50 and 30000"
                )));
            }
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_health_interval_ms() -> u64 {
    2000
}
fn default_local_timeout_ms() -> u64 {
    1000
}
fn default_overlay_timeout_ms() -> u64 {
    3000
}
fn default_application_timeout_ms() -> u64 {
    3000
}
