//! Hub WebSocket handler.
//!
//! Responsibilities:
//! - Authorize `userId` (+ optional `token`) before the upgrade
//! - Register the socket, announce presence, unregister on any exit
//! - Lifecycle: ping ticker + read deadline
//! - Decode-once then dispatch, in receipt order

use axum::{
    extract::{ws::Message, ws::WebSocket, ws::WebSocketUpgrade, Query, State},
    response::Response,
};
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::Instrument;

use relayhub_core::error::{RelayError, Result};

use crate::app_state::AppState;
use crate::auth::Identity;
use crate::dispatch::Flow;
use crate::error::ApiError;
use crate::realtime::{Connection, RealtimeCtx};
use crate::shutdown;
use crate::transport::codec::{decode, Frame};
use crate::transport::socket::{keepalive, write_loop};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(rename = "userId", default)]
    pub user_id: String,
    #[serde(rename = "userName")]
    pub user_name: Option<String>,
    pub token: Option<String>,
}

/// The credential is `token` when present, else the user id itself. The
/// authenticated id must match the claimed `userId`.
pub async fn authorize(app: &AppState, q: &WsQuery) -> Result<Identity> {
    let user_id = q.user_id.trim();
    if user_id.is_empty() {
        return Err(RelayError::BadRequest("userId is required".into()));
    }

    let credential = q
        .token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(user_id);

    let identity = app
        .auth()
        .authenticate(credential)
        .await
        .ok_or(RelayError::AuthFailed)?;
    if identity.user_id.is_empty() || identity.user_id != user_id {
        return Err(RelayError::AuthFailed);
    }
    Ok(identity)
}

pub async fn ws_upgrade(
    State(app): State<AppState>,
    ws: WebSocketUpgrade,
    Query(q): Query<WsQuery>,
) -> std::result::Result<Response, ApiError> {
    if app.is_shutting_down() {
        return Err(RelayError::Transport("hub is shutting down".into()).into());
    }

    let identity = authorize(&app, &q).await.map_err(|e| {
        tracing::warn!(user = %q.user_id, code = e.client_code().as_str(), "ws upgrade rejected");
        ApiError::from(e)
    })?;

    let display_name = identity
        .display_name
        .clone()
        .or_else(|| q.user_name.clone().filter(|n| !n.trim().is_empty()))
        .unwrap_or_else(|| app.cfg().hub.default_user_name.clone());

    Ok(ws.on_upgrade(move |socket| {
        let span = tracing::info_span!("session", user = %identity.user_id);
        run_session(app, identity.user_id, display_name, socket).instrument(span)
    }))
}

async fn run_session(app: AppState, user: String, display_name: String, socket: WebSocket) {
    let hub = &app.cfg().hub;
    let core = app.realtime();
    let dispatcher = app.dispatcher();

    let (out_tx, out_rx) = mpsc::channel::<Message>(hub.outbound_queue);
    let session_id = core.sessions.next_session_id();
    let (conn, mut closed) = Connection::new(session_id, &display_name, out_tx.clone());

    let (ws_tx, mut ws_rx) = socket.split();
    let writer = tokio::spawn(write_loop(ws_tx, out_rx, conn.closed()));
    let pinger = tokio::spawn(keepalive(out_tx, hub.ping_interval(), conn.closed()));

    core.register(&user, conn.clone()).await;
    tracing::info!(session = session_id, name = %display_name, "session registered");

    let ctx = RealtimeCtx::new(user.as_str(), session_id, core.clone());
    let mut shutdown_rx = app.shutdown_rx();
    let read_deadline = hub.read_deadline();

    loop {
        let next = tokio::select! {
            _ = shutdown::requested(&mut closed) => {
                tracing::debug!("session closed");
                break;
            }
            _ = shutdown::requested(&mut shutdown_rx) => break,
            r = timeout(read_deadline, ws_rx.next()) => r,
        };

        let msg = match next {
            Err(_) => {
                tracing::info!(deadline_ms = hub.read_deadline_ms, "read deadline exceeded");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                tracing::debug!(error = %e, "socket read failed");
                break;
            }
            Ok(Some(Ok(m))) => m,
        };
        conn.touch();

        match decode(msg) {
            Ok(Frame::Envelope(inbound)) => {
                if dispatcher.dispatch(&ctx, inbound).await == Flow::Close {
                    break;
                }
            }
            Ok(Frame::Control) => {}
            Ok(Frame::Close) => break,
            Err(e) => {
                tracing::warn!(code = e.client_code().as_str(), error = %e, "malformed frame dropped");
            }
        }
    }

    conn.close();
    let removed = core.unregister(&user, session_id).await;
    let _ = writer.await;
    let _ = pinger.await;
    tracing::info!(session = session_id, removed, "session ended");
}
