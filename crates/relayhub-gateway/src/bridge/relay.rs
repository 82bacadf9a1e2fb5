//! Bridge relay: one upstream hub connection per local session.
//!
//! `Disconnected -> Connecting -> Connected -> Disconnected`, repeated until
//! the local session ends, shutdown is requested, or a reconnect sequence is
//! exhausted (`connection_lost`, terminal).

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message as LocalMessage;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message as UpMessage;
use tokio_tungstenite::WebSocketStream;
use url::Url;

use relayhub_core::error::{RelayError, Result};
use relayhub_core::protocol::{ConnectionStatus, Event};

use crate::bridge::backoff::Backoff;
use crate::config::BridgeConfig;
use crate::overlay::{Overlay, OverlayStream};
use crate::shutdown;

pub type Upstream = WebSocketStream<OverlayStream>;
type UpstreamSink = SplitSink<Upstream, UpMessage>;

const CLOSE_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The local session went away; the upstream was closed with it.
    LocalClosed,
    Shutdown,
    /// Every reconnect attempt failed; `connection_lost` was emitted.
    Exhausted,
}

/// Who the relay connects as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayParams {
    pub user_id: String,
    pub user_name: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub hub_addr: String,
    pub ping_interval: Duration,
    pub idle_timeout: Duration,
    pub dial_timeout: Duration,
    pub write_timeout: Duration,
    pub backoff: Backoff,
}

impl RelaySettings {
    pub fn from_config(cfg: &BridgeConfig) -> Self {
        Self {
            hub_addr: cfg.bridge.hub_addr.clone(),
            ping_interval: cfg.bridge.ping_interval(),
            idle_timeout: cfg.bridge.idle_timeout(),
            dial_timeout: Duration::from_millis(cfg.health.overlay_timeout_ms),
            write_timeout: cfg.bridge.write_timeout(),
            backoff: Backoff::from_config(&cfg.backoff),
        }
    }
}

enum Reconnect {
    Connected(Upstream),
    Exhausted,
    Stopped(RelayOutcome),
}

enum PumpEnd {
    UpstreamLost,
    Stopped(RelayOutcome),
}

pub struct BridgeRelay {
    params: RelayParams,
    settings: RelaySettings,
    overlay: Arc<dyn Overlay>,
    local: mpsc::Sender<LocalMessage>,
    state: watch::Sender<RelayState>,
    shutdown: watch::Receiver<bool>,
}

impl BridgeRelay {
    pub fn new(
        params: RelayParams,
        settings: RelaySettings,
        overlay: Arc<dyn Overlay>,
        local: mpsc::Sender<LocalMessage>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let (state, _) = watch::channel(RelayState::Disconnected);
        Self {
            params,
            settings,
            overlay,
            local,
            state,
            shutdown,
        }
    }

    pub fn state(&self) -> watch::Receiver<RelayState> {
        self.state.subscribe()
    }

    /// `ws://{hub_addr}/ws?userId=..&userName=..&token=..`
    pub fn hub_url(&self) -> Result<Url> {
        let mut url = Url::parse(&format!("ws://{}/ws", self.settings.hub_addr))
            .map_err(|e| RelayError::BadRequest(format!("invalid hub address: {e}")))?;
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("userId", &self.params.user_id);
            if let Some(name) = &self.params.user_name {
                q.append_pair("userName", name);
            }
            if let Some(token) = &self.params.token {
                q.append_pair("token", token);
            }
        }
        Ok(url)
    }

    /// Relay text frames between `from_local` and the hub until the relay
    /// reaches a terminal outcome.
    pub async fn run(self, mut from_local: mpsc::Receiver<String>) -> RelayOutcome {
        let mut shutdown = self.shutdown.clone();
        self.state.send_replace(RelayState::Connecting);

        let mut upstream = match self.dial().await {
            Ok(ws) => Some(ws),
            Err(e) => {
                tracing::warn!(error = %e, "initial dial failed");
                None
            }
        };

        loop {
            let ws = match upstream.take() {
                Some(ws) => ws,
                None => match self.reconnect(&mut from_local, &mut shutdown).await {
                    Reconnect::Connected(ws) => ws,
                    Reconnect::Stopped(outcome) => return self.finish(outcome),
                    Reconnect::Exhausted => {
                        tracing::error!(
                            attempts = self.settings.backoff.max_attempts,
                            "reconnect attempts exhausted"
                        );
                        self.emit(&Event::ConnectionLost).await;
                        return self.finish(RelayOutcome::Exhausted);
                    }
                },
            };

            self.state.send_replace(RelayState::Connected);
            tracing::info!(hub = %self.settings.hub_addr, "upstream connected");
            self.emit(&Event::status(ConnectionStatus::Connected)).await;

            match self.pump(ws, &mut from_local, &mut shutdown).await {
                PumpEnd::UpstreamLost => {
                    self.state.send_replace(RelayState::Disconnected);
                    tracing::warn!("upstream lost, reconnecting");
                }
                PumpEnd::Stopped(outcome) => return self.finish(outcome),
            }
        }
    }

    fn finish(&self, outcome: RelayOutcome) -> RelayOutcome {
        self.state.send_replace(RelayState::Disconnected);
        tracing::info!(?outcome, "relay stopped");
        outcome
    }

    async fn dial(&self) -> Result<Upstream> {
        let url = self.hub_url()?;
        let connect = async {
            let stream = self.overlay.dial(&self.settings.hub_addr).await?;
            let (ws, _resp) = tokio_tungstenite::client_async(url.as_str(), stream)
                .await
                .map_err(|e| RelayError::Transport(format!("ws handshake failed: {e}")))?;
            Ok::<_, RelayError>(ws)
        };
        timeout(self.settings.dial_timeout, connect)
            .await
            .map_err(|_| RelayError::Timeout)?
    }

    /// One reconnect sequence. The local session first learns the upstream
    /// is down (`connection_status tsnet_disconnected`), so it knows to
    /// resubmit after the next `connected`. Each attempt waits its backoff;
    /// the wait observes shutdown and the local session. Local frames
    /// arriving while disconnected are dropped, not buffered.
    async fn reconnect(
        &self,
        from_local: &mut mpsc::Receiver<String>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Reconnect {
        self.state.send_replace(RelayState::Connecting);
        self.emit(&Event::status(ConnectionStatus::TsnetDisconnected)).await;
        let backoff = self.settings.backoff;

        for attempt in 1..=backoff.max_attempts {
            let wait = backoff.delay(attempt);
            tracing::info!(attempt, wait_ms = wait.as_millis() as u64, "reconnect scheduled");

            let sleep = tokio::time::sleep(wait);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    _ = &mut sleep => break,
                    _ = shutdown::requested(shutdown) => {
                        return Reconnect::Stopped(RelayOutcome::Shutdown);
                    }
                    frame = from_local.recv() => match frame {
                        Some(_) => tracing::debug!("local frame dropped while disconnected"),
                        None => return Reconnect::Stopped(RelayOutcome::LocalClosed),
                    },
                }
            }

            let dialed = tokio::select! {
                r = self.dial() => r,
                _ = shutdown::requested(shutdown) => {
                    return Reconnect::Stopped(RelayOutcome::Shutdown);
                }
            };
            match dialed {
                Ok(ws) => {
                    let mut dropped = 0usize;
                    while from_local.try_recv().is_ok() {
                        dropped += 1;
                    }
                    if dropped > 0 {
                        tracing::debug!(dropped, "local frames dropped during reconnect");
                    }
                    return Reconnect::Connected(ws);
                }
                Err(e) => tracing::warn!(attempt, error = %e, "reconnect attempt failed"),
            }
        }
        Reconnect::Exhausted
    }

    async fn pump(
        &self,
        ws: Upstream,
        from_local: &mut mpsc::Receiver<String>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> PumpEnd {
        let (mut up_tx, mut up_rx) = ws.split();
        let every = self.settings.ping_interval;
        let mut ping = interval_at(Instant::now() + every, every);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_seen = Instant::now();

        loop {
            tokio::select! {
                _ = shutdown::requested(shutdown) => {
                    let _ = timeout(CLOSE_GRACE, up_tx.send(UpMessage::Close(None))).await;
                    return PumpEnd::Stopped(RelayOutcome::Shutdown);
                }

                frame = from_local.recv() => match frame {
                    Some(text) => {
                        if let Err(e) = self.write_up(&mut up_tx, UpMessage::Text(text)).await {
                            tracing::warn!(error = %e, "upstream write failed");
                            return PumpEnd::UpstreamLost;
                        }
                    }
                    None => {
                        let _ = timeout(CLOSE_GRACE, up_tx.send(UpMessage::Close(None))).await;
                        return PumpEnd::Stopped(RelayOutcome::LocalClosed);
                    }
                },

                incoming = up_rx.next() => match incoming {
                    Some(Ok(UpMessage::Text(text))) => {
                        last_seen = Instant::now();
                        if self.local.send(LocalMessage::Text(text)).await.is_err() {
                            let _ = timeout(CLOSE_GRACE, up_tx.send(UpMessage::Close(None))).await;
                            return PumpEnd::Stopped(RelayOutcome::LocalClosed);
                        }
                    }
                    Some(Ok(UpMessage::Close(_))) | None => {
                        tracing::info!("upstream closed by hub");
                        return PumpEnd::UpstreamLost;
                    }
                    Some(Ok(_)) => last_seen = Instant::now(),
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "upstream read failed");
                        return PumpEnd::UpstreamLost;
                    }
                },

                _ = ping.tick() => {
                    if last_seen.elapsed() >= self.settings.idle_timeout {
                        tracing::warn!("upstream idle timeout");
                        return PumpEnd::UpstreamLost;
                    }
                    if let Err(e) = self.write_up(&mut up_tx, UpMessage::Ping(Vec::new())).await {
                        tracing::warn!(error = %e, "upstream ping failed");
                        return PumpEnd::UpstreamLost;
                    }
                }
            }
        }
    }

    /// A write that cannot complete within `write_timeout` counts as a lost
    /// upstream, so a blackholed hub cannot stall the pump.
    async fn write_up(&self, up_tx: &mut UpstreamSink, msg: UpMessage) -> Result<()> {
        match timeout(self.settings.write_timeout, up_tx.send(msg)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(RelayError::Transport(e.to_string())),
            Err(_) => Err(RelayError::Timeout),
        }
    }

    async fn emit(&self, ev: &Event) {
        match ev.to_json() {
            Ok(text) => {
                let _ = self.local.send(LocalMessage::Text(text)).await;
            }
            Err(e) => tracing::error!(error = %e, "event encode failed"),
        }
    }
}
