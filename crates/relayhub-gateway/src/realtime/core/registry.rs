use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

use crate::realtime::types::PreparedMsg;

/// One live socket: its outbound queue plus a close signal observed by the
/// socket's reader, writer, and keepalive tasks.
#[derive(Clone)]
pub struct Connection {
    pub session_id: u64,
    pub display_name: Arc<str>,
    pub tx: mpsc::Sender<Message>,
    closer: Arc<watch::Sender<bool>>,
    last_seen: Arc<AtomicI64>,
}

impl Connection {
    pub fn new(
        session_id: u64,
        display_name: &str,
        tx: mpsc::Sender<Message>,
    ) -> (Self, watch::Receiver<bool>) {
        let (closer, closed) = watch::channel(false);
        let conn = Self {
            session_id,
            display_name: Arc::from(display_name),
            tx,
            closer: Arc::new(closer),
            last_seen: Arc::new(AtomicI64::new(Utc::now().timestamp_millis())),
        };
        (conn, closed)
    }

    /// Idempotent. Returns true only for the call that actually closed it.
    pub fn close(&self) -> bool {
        !self.closer.send_replace(true)
    }

    pub fn is_closed(&self) -> bool {
        *self.closer.borrow()
    }

    /// Another receiver for the close signal.
    pub fn closed(&self) -> watch::Receiver<bool> {
        self.closer.subscribe()
    }

    pub fn touch(&self) {
        self.last_seen
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    pub fn last_seen(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_seen.load(Ordering::Relaxed))
            .unwrap_or_default()
    }

    /// Queue with a deadline. A peer that cannot accept in time is closed.
    pub async fn send_within(&self, msg: Message, deadline: Duration) -> bool {
        if self.is_closed() {
            return false;
        }
        match timeout(deadline, self.tx.send(msg)).await {
            Ok(Ok(())) => true,
            _ => {
                self.close();
                false
            }
        }
    }
}

/// Result of a fan-out.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// `user_id -> Connection`, at most one live session per user.
///
/// The map is never exposed; every access goes through this API, and no lock
/// is held across an await (fan-out works on a cloned snapshot).
#[derive(Default)]
pub struct ConnectionRegistry {
    sessions: DashMap<String, Connection>,
    seq: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            seq: AtomicU64::new(1),
        }
    }

    pub fn next_session_id(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Last writer wins: a previous session for `user` is closed and returned.
    pub fn register(&self, user: &str, conn: Connection) -> Option<Connection> {
        let prev = self.sessions.insert(user.to_string(), conn);
        if let Some(old) = &prev {
            old.close();
        }
        prev
    }

    /// Remove `user` only if `session_id` is still the registered session, so
    /// a replaced socket's teardown never evicts its successor.
    pub fn unregister(&self, user: &str, session_id: u64) -> bool {
        self.sessions
            .remove_if(user, |_, c| c.session_id == session_id)
            .is_some()
    }

    pub fn lookup(&self, user: &str) -> Option<Connection> {
        self.sessions.get(user).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Snapshot of `(user, connection)` pairs, optionally without `exclude`.
    pub fn snapshot(&self, exclude: Option<&str>) -> Vec<(String, Connection)> {
        self.sessions
            .iter()
            .filter(|e| exclude != Some(e.key().as_str()))
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// Send to every registered connection except `exclude`, each with its own
    /// deadline. Slow or dead peers are closed, never awaited past `deadline`.
    pub async fn broadcast(
        &self,
        exclude: Option<&str>,
        msg: &PreparedMsg,
        deadline: Duration,
    ) -> BroadcastReport {
        let peers = self.snapshot(exclude);

        let mut futs = FuturesUnordered::new();
        for (user, conn) in peers {
            let m = msg.to_ws_message();
            futs.push(async move {
                let ok = conn.send_within(m, deadline).await;
                if !ok {
                    tracing::debug!(peer = %user, "broadcast send failed, peer closed");
                }
                ok
            });
        }

        let mut report = BroadcastReport::default();
        while let Some(ok) = futs.next().await {
            if ok {
                report.delivered += 1;
            } else {
                report.failed += 1;
            }
        }
        report
    }

    /// Close every registered socket. Each socket is closed at most once no
    /// matter how often this runs; returns how many this call closed.
    pub fn close_all(&self) -> usize {
        self.snapshot(None)
            .into_iter()
            .filter(|(_, c)| c.close())
            .count()
    }
}
