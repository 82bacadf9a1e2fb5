//! Bridge local surface (loopback only).
//!
//! - `/health`      : liveness of the bridge itself
//! - `/api/health`  : latest health cascade snapshot
//! - `/api/*`       : proxied to the hub over the overlay (502 when unreachable,
//!                    504 when the hub does not answer within the overlay timeout)
//! - `/ws`          : local session, one per user, each with its own relay

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ws::Message, ws::WebSocket, ws::WebSocketUpgrade, Query, Request, State},
    http::{
        header::{HOST, ORIGIN},
        HeaderValue, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::Instrument;

use relayhub_core::error::{RelayError, Result};
use relayhub_core::protocol::Event;

use crate::bridge::health::HealthReport;
use crate::bridge::http;
use crate::bridge::relay::{BridgeRelay, RelayParams, RelaySettings};
use crate::config::BridgeConfig;
use crate::cors;
use crate::error::ApiError;
use crate::overlay::Overlay;
use crate::realtime::{Connection, ConnectionRegistry, PreparedMsg};
use crate::shutdown;
use crate::transport::socket::{keepalive, write_loop};

#[derive(Clone)]
pub struct BridgeState {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    cfg: BridgeConfig,
    settings: RelaySettings,
    overlay: Arc<dyn Overlay>,
    locals: Arc<ConnectionRegistry>,
    health: watch::Receiver<HealthReport>,
    shutdown: watch::Sender<bool>,
}

impl BridgeState {
    pub fn new(
        cfg: BridgeConfig,
        overlay: Arc<dyn Overlay>,
        health: watch::Receiver<HealthReport>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(BridgeInner {
                settings: RelaySettings::from_config(&cfg),
                cfg,
                overlay,
                locals: Arc::new(ConnectionRegistry::new()),
                health,
                shutdown,
            }),
        }
    }

    pub fn cfg(&self) -> &BridgeConfig {
        &self.inner.cfg
    }

    pub fn locals(&self) -> Arc<ConnectionRegistry> {
        Arc::clone(&self.inner.locals)
    }

    pub fn health(&self) -> HealthReport {
        self.inner.health.borrow().clone()
    }

    pub fn shutdown_rx(&self) -> watch::Receiver<bool> {
        self.inner.shutdown.subscribe()
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.inner.shutdown.borrow()
    }

    /// Flip the shutdown flag (relays stop, even mid-backoff) and close every
    /// local socket once.
    pub fn begin_shutdown(&self) -> usize {
        self.inner.shutdown.send_replace(true);
        let closed = self.inner.locals.close_all();
        tracing::info!(closed, "bridge shutdown: local sessions closed");
        closed
    }

    /// Push `connection_status` to every local session when the composite
    /// health status changes.
    pub fn spawn_status_push(&self) -> tokio::task::JoinHandle<()> {
        let locals = self.locals();
        let mut health = self.inner.health.clone();
        let mut stop = self.shutdown_rx();
        let deadline = self.inner.cfg.bridge.ping_interval();

        tokio::spawn(async move {
            let mut last = health.borrow_and_update().status;
            loop {
                tokio::select! {
                    _ = shutdown::requested(&mut stop) => break,
                    changed = health.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let status = health.borrow_and_update().status;
                        if status == last {
                            continue;
                        }
                        last = status;
                        match PreparedMsg::prepare(&Event::status(status)) {
                            Ok(msg) => {
                                let report = locals.broadcast(None, &msg, deadline).await;
                                tracing::debug!(status = status.as_str(), delivered = report.delivered, "status pushed");
                            }
                            Err(e) => tracing::error!(error = %e, "status encode failed"),
                        }
                    }
                }
            }
        })
    }
}

pub fn build_router(state: BridgeState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/health", get(api_health))
        .route("/api/*rest", any(proxy))
        .route("/ws", get(local_ws))
        .layer(cors::layer())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn api_health(State(state): State<BridgeState>) -> Json<HealthReport> {
    Json(state.health())
}

async fn proxy(State(state): State<BridgeState>, req: Request) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let deadline = state.inner.settings.dial_timeout;
    let result = match timeout(deadline, forward(&state, req)).await {
        Ok(r) => r,
        Err(_) => Err(RelayError::Timeout),
    };
    match result {
        Ok(resp) => resp,
        Err(e) => {
            tracing::warn!(%method, %path, error = %e, "proxy to hub failed");
            let status = match e {
                RelayError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::BAD_GATEWAY,
            };
            let body = Json(json!({
                "error": e.client_code().as_str(),
                "message": e.to_string(),
            }));
            (status, body).into_response()
        }
    }
}

async fn forward(state: &BridgeState, req: Request) -> Result<Response> {
    let hub_addr = &state.inner.cfg.bridge.hub_addr;
    let (mut parts, body) = req.into_parts();

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or("/");
    parts.uri = path_and_query
        .parse::<Uri>()
        .map_err(|e| RelayError::BadRequest(format!("bad request uri: {e}")))?;
    let host = HeaderValue::from_str(hub_addr)
        .map_err(|e| RelayError::Internal(format!("bad hub address: {e}")))?;
    parts.headers.insert(HOST, host);
    // CORS is answered here; the hub sees a plain server-to-server call
    parts.headers.remove(ORIGIN);

    let stream = state.inner.overlay.dial(hub_addr).await?;
    let resp = http::send(stream, Request::from_parts(parts, body)).await?;
    Ok(resp.map(Body::new))
}

#[derive(Debug, Deserialize)]
pub struct LocalQuery {
    #[serde(rename = "userId", default)]
    pub user_id: String,
    #[serde(rename = "userName")]
    pub user_name: Option<String>,
    pub token: Option<String>,
}

async fn local_ws(
    State(state): State<BridgeState>,
    ws: WebSocketUpgrade,
    Query(q): Query<LocalQuery>,
) -> std::result::Result<Response, ApiError> {
    if state.is_shutting_down() {
        return Err(RelayError::Transport("bridge is shutting down".into()).into());
    }
    let user_id = q.user_id.trim().to_string();
    if user_id.is_empty() {
        return Err(RelayError::BadRequest("userId is required".into()).into());
    }

    let params = RelayParams {
        user_id,
        user_name: q.user_name.filter(|n| !n.trim().is_empty()),
        token: q.token.filter(|t| !t.trim().is_empty()),
    };

    Ok(ws.on_upgrade(move |socket| {
        let span = tracing::info_span!("local", user = %params.user_id);
        run_local(state, params, socket).instrument(span)
    }))
}

async fn run_local(state: BridgeState, params: RelayParams, socket: WebSocket) {
    let inner = &state.inner;
    let bridge = &inner.cfg.bridge;
    let user = params.user_id.clone();
    let name = params.user_name.clone().unwrap_or_else(|| user.clone());

    let (out_tx, out_rx) = mpsc::channel::<Message>(bridge.local_queue);
    let session_id = inner.locals.next_session_id();
    let (conn, mut closed) = Connection::new(session_id, &name, out_tx.clone());

    let (ws_tx, mut ws_rx) = socket.split();
    let writer = tokio::spawn(write_loop(ws_tx, out_rx, conn.closed()));
    let pinger = tokio::spawn(keepalive(out_tx.clone(), bridge.ping_interval(), conn.closed()));

    if let Some(old) = inner.locals.register(&user, conn.clone()) {
        tracing::info!(replaced = old.session_id, "local session replaced");
    }
    tracing::info!(session = session_id, "local session opened");

    let (to_relay, from_local) = mpsc::channel::<String>(bridge.local_queue);
    let relay = BridgeRelay::new(
        params,
        inner.settings.clone(),
        inner.overlay.clone(),
        out_tx.clone(),
        state.shutdown_rx(),
    );
    let mut relay_task = Some(tokio::spawn(relay.run(from_local)));

    let idle = bridge.idle_timeout();
    loop {
        let Some(task) = relay_task.as_mut() else {
            break;
        };
        let next = tokio::select! {
            _ = shutdown::requested(&mut closed) => break,
            outcome = task => {
                tracing::info!(?outcome, "relay ended, closing local session");
                relay_task = None;
                break;
            }
            r = timeout(idle, ws_rx.next()) => r,
        };

        match next {
            Err(_) => {
                tracing::info!("local read deadline exceeded");
                break;
            }
            Ok(None) | Ok(Some(Err(_))) => break,
            Ok(Some(Ok(msg))) => {
                conn.touch();
                match msg {
                    Message::Text(text) => {
                        if to_relay.send(text).await.is_err() {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
                }
            }
        }
    }

    drop(to_relay);
    conn.close();
    inner.locals.unregister(&user, session_id);
    if let Some(task) = relay_task {
        let _ = task.await;
    }
    let _ = writer.await;
    let _ = pinger.await;
    tracing::info!(session = session_id, "local session closed");
}
