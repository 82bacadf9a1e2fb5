//! Shared helpers for the gateway integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use relayhub_gateway::app_state::AppState;
use relayhub_gateway::config::HubConfig;
use relayhub_gateway::router;

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const WAIT: Duration = Duration::from_secs(3);

pub async fn spawn_hub(cfg: HubConfig) -> (SocketAddr, AppState) {
    let state = AppState::from_config(cfg);
    let addr = serve(router::build_router(state.clone())).await;
    (addr, state)
}

pub async fn serve(app: axum::Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub async fn connect(addr: SocketAddr, query: &str) -> Client {
    let (ws, _resp) = connect_async(format!("ws://{addr}/ws?{query}"))
        .await
        .unwrap();
    ws
}

/// Connect as `user` and wait until the hub has registered the session.
pub async fn join(addr: SocketAddr, state: &AppState, user: &str) -> Client {
    let ws = connect(addr, &format!("userId={user}")).await;
    wait_registered(state, user).await;
    ws
}

pub async fn wait_registered(state: &AppState, user: &str) {
    let deadline = Instant::now() + WAIT;
    while state.realtime().sessions.lookup(user).is_none() {
        assert!(Instant::now() < deadline, "{user} never registered");
        sleep(Duration::from_millis(10)).await;
    }
}

pub async fn wait_unregistered(state: &AppState, user: &str) {
    let deadline = Instant::now() + WAIT;
    while state.realtime().sessions.lookup(user).is_some() {
        assert!(Instant::now() < deadline, "{user} never unregistered");
        sleep(Duration::from_millis(10)).await;
    }
}

pub async fn send(ws: &mut Client, frame: Value) {
    ws.send(Message::Text(frame.to_string())).await.unwrap();
}

/// Next text envelope within `within`, or `None` on silence / close.
pub async fn next_event_within(ws: &mut Client, within: Duration) -> Option<Value> {
    let deadline = Instant::now() + within;
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        match timeout(left, ws.next()).await {
            Ok(Some(Ok(Message::Text(t)))) => return Some(serde_json::from_str(&t).unwrap()),
            Ok(Some(Ok(Message::Close(_)))) | Ok(None) | Ok(Some(Err(_))) | Err(_) => return None,
            Ok(Some(Ok(_))) => continue,
        }
    }
}

/// Skip envelopes until one of type `ty` arrives.
pub async fn next_of_type(ws: &mut Client, ty: &str) -> Value {
    let deadline = Instant::now() + WAIT;
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        let ev = next_event_within(ws, left)
            .await
            .unwrap_or_else(|| panic!("no {ty} event arrived"));
        if ev["type"] == ty {
            return ev;
        }
    }
}

/// Every envelope received during `window` (keeps answering pings).
pub async fn collect_for(ws: &mut Client, window: Duration) -> Vec<Value> {
    let deadline = Instant::now() + window;
    let mut out = Vec::new();
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            return out;
        }
        match next_event_within(ws, left).await {
            Some(ev) => out.push(ev),
            None => return out,
        }
    }
}

/// True once the peer has closed the socket.
pub async fn closed_within(ws: &mut Client, within: Duration) -> bool {
    let deadline = Instant::now() + within;
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        match timeout(left, ws.next()).await {
            Err(_) => return false,
            Ok(None) | Ok(Some(Err(_))) | Ok(Some(Ok(Message::Close(_)))) => return true,
            Ok(Some(Ok(_))) => continue,
        }
    }
}

pub fn status_events<'a>(events: &'a [Value], user: &str, status: &str) -> Vec<&'a Value> {
    events
        .iter()
        .filter(|e| {
            e["type"] == "user_status"
                && e["payload"]["userId"] == user
                && e["payload"]["status"] == status
        })
        .collect()
}

/// Pong frames carrying `payload` seen during `window`.
pub async fn count_pongs(ws: &mut Client, payload: &[u8], window: Duration) -> usize {
    let deadline = Instant::now() + window;
    let mut pongs = 0;
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        match timeout(left, ws.next()).await {
            Ok(Some(Ok(Message::Pong(p)))) if p == payload => pongs += 1,
            Ok(Some(Ok(_))) => continue,
            _ => return pongs,
        }
    }
}
