//! Health cascade: local -> overlay -> application.
//!
//! Tiers are probed concurrently, each under its own timeout. The composite
//! status is `connected` only when all pass, otherwise the first failing
//! tier's name in cascade order.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hyper::StatusCode;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{interval, timeout, MissedTickBehavior};

use relayhub_core::error::{RelayError, Result};
use relayhub_core::protocol::ConnectionStatus;

use crate::bridge::http;
use crate::config::BridgeConfig;
use crate::overlay::Overlay;
use crate::shutdown;

#[async_trait]
pub trait Probe: Send + Sync {
    async fn check(&self) -> Result<()>;
}

fn expect_ok(status: StatusCode, what: &str) -> Result<()> {
    if status == StatusCode::OK {
        Ok(())
    } else {
        Err(RelayError::Transport(format!("{what} answered {status}")))
    }
}

/// The bridge's own loopback `/health`.
pub struct LocalProbe {
    pub addr: String,
}

#[async_trait]
impl Probe for LocalProbe {
    async fn check(&self) -> Result<()> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| RelayError::Transport(format!("local bridge unreachable: {e}")))?;
        let status = http::get_status(stream, &self.addr, "/health").await?;
        expect_ok(status, "local bridge")
    }
}

/// Hub reachable through the overlay: any HTTP answer from `/health` counts.
pub struct OverlayProbe {
    pub overlay: Arc<dyn Overlay>,
    pub hub_addr: String,
}

#[async_trait]
impl Probe for OverlayProbe {
    async fn check(&self) -> Result<()> {
        let stream = self.overlay.dial(&self.hub_addr).await?;
        http::get_status(stream, &self.hub_addr, "/health").await?;
        Ok(())
    }
}

/// Hub's own dependencies healthy: `/health` must be 200.
pub struct ApplicationProbe {
    pub overlay: Arc<dyn Overlay>,
    pub hub_addr: String,
}

#[async_trait]
impl Probe for ApplicationProbe {
    async fn check(&self) -> Result<()> {
        let stream = self.overlay.dial(&self.hub_addr).await?;
        let status = http::get_status(stream, &self.hub_addr, "/health").await?;
        expect_ok(status, "hub")
    }
}

struct Tier {
    probe: Arc<dyn Probe>,
    timeout: Duration,
}

impl Tier {
    async fn passes(&self) -> bool {
        matches!(timeout(self.timeout, self.probe.check()).await, Ok(Ok(())))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub local: bool,
    pub tsnet: bool,
    pub server: bool,
    pub status: ConnectionStatus,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    pub fn new(local: bool, tsnet: bool, server: bool) -> Self {
        let status = if !local {
            ConnectionStatus::LocalDisconnected
        } else if !tsnet {
            ConnectionStatus::TsnetDisconnected
        } else if !server {
            ConnectionStatus::ServerDisconnected
        } else {
            ConnectionStatus::Connected
        };
        Self {
            local,
            tsnet,
            server,
            status,
            checked_at: Utc::now(),
        }
    }

    /// Before the first probe completes.
    pub fn unknown() -> Self {
        Self::new(false, false, false)
    }
}

pub struct HealthCascade {
    local: Tier,
    overlay: Tier,
    application: Tier,
    every: Duration,
}

impl HealthCascade {
    pub fn new(
        local: Arc<dyn Probe>,
        overlay: Arc<dyn Probe>,
        application: Arc<dyn Probe>,
        timeouts: [Duration; 3],
        every: Duration,
    ) -> Self {
        let [t_local, t_overlay, t_app] = timeouts;
        Self {
            local: Tier { probe: local, timeout: t_local },
            overlay: Tier { probe: overlay, timeout: t_overlay },
            application: Tier { probe: application, timeout: t_app },
            every,
        }
    }

    pub fn from_config(cfg: &BridgeConfig, overlay: Arc<dyn Overlay>) -> Self {
        let hub_addr = cfg.bridge.hub_addr.clone();
        let h = &cfg.health;
        Self::new(
            Arc::new(LocalProbe {
                addr: cfg.bridge.listen.clone(),
            }),
            Arc::new(OverlayProbe {
                overlay: overlay.clone(),
                hub_addr: hub_addr.clone(),
            }),
            Arc::new(ApplicationProbe { overlay, hub_addr }),
            [
                Duration::from_millis(h.local_timeout_ms),
                Duration::from_millis(h.overlay_timeout_ms),
                Duration::from_millis(h.application_timeout_ms),
            ],
            h.interval(),
        )
    }

    pub async fn check(&self) -> HealthReport {
        let (local, tsnet, server) = tokio::join!(
            self.local.passes(),
            self.overlay.passes(),
            self.application.passes(),
        );
        HealthReport::new(local, tsnet, server)
    }

    /// Probe on a fixed interval, publishing every report, until shutdown.
    pub async fn run(self, tx: watch::Sender<HealthReport>, mut stop: watch::Receiver<bool>) {
        let mut tick = interval(self.every);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown::requested(&mut stop) => break,
                _ = tick.tick() => {
                    let report = self.check().await;
                    let prev = tx.borrow().status;
                    if prev != report.status {
                        tracing::info!(from = prev.as_str(), to = report.status.as_str(), "health status changed");
                    }
                    tx.send_replace(report);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(bool);

    #[async_trait]
    impl Probe for Fixed {
        async fn check(&self) -> Result<()> {
            if self.0 {
                Ok(())
            } else {
                Err(RelayError::Transport("down".into()))
            }
        }
    }

    struct Hangs;

    #[async_trait]
    impl Probe for Hangs {
        async fn check(&self) -> Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    fn cascade(local: Arc<dyn Probe>, overlay: Arc<dyn Probe>, app: Arc<dyn Probe>) -> HealthCascade {
        HealthCascade::new(
            local,
            overlay,
            app,
            [Duration::from_millis(50); 3],
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn store_down_reports_application_tier() {
        let c = cascade(Arc::new(Fixed(true)), Arc::new(Fixed(true)), Arc::new(Fixed(false)));
        let r = c.check().await;
        assert_eq!(r.status, ConnectionStatus::ServerDisconnected);
        assert!(r.local && r.tsnet && !r.server);
    }

    #[tokio::test]
    async fn first_failing_tier_wins() {
        let c = cascade(Arc::new(Fixed(true)), Arc::new(Fixed(false)), Arc::new(Fixed(false)));
        assert_eq!(c.check().await.status, ConnectionStatus::TsnetDisconnected);

        let c = cascade(Arc::new(Fixed(false)), Arc::new(Fixed(true)), Arc::new(Fixed(true)));
        assert_eq!(c.check().await.status, ConnectionStatus::LocalDisconnected);

        let c = cascade(Arc::new(Fixed(true)), Arc::new(Fixed(true)), Arc::new(Fixed(true)));
        assert_eq!(c.check().await.status, ConnectionStatus::Connected);
    }

    #[tokio::test]
    async fn hung_probe_fails_by_timeout() {
        let c = cascade(Arc::new(Fixed(true)), Arc::new(Hangs), Arc::new(Fixed(true)));
        let started = std::time::Instant::now();
        assert_eq!(c.check().await.status, ConnectionStatus::TsnetDisconnected);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn report_json_shape() {
        let v = serde_json::to_value(HealthReport::new(true, true, false)).unwrap();
        assert_eq!(v["status"], "server_disconnected");
        assert_eq!(v["tsnet"], true);
        assert!(v.get("checkedAt").is_some());
    }
}
