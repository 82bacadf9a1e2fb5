use std::sync::Arc;
use std::time::Duration;

use relayhub_core::error::Result;
use relayhub_core::protocol::{Event, PresenceStatus};

use crate::realtime::core::{Connection, ConnectionRegistry, Presence};
use crate::realtime::types::{Delivery, PreparedMsg};

/// RealtimeCore: egress engine (send to user / presence fan-out).
pub struct RealtimeCore {
    pub sessions: Arc<ConnectionRegistry>,
    pub presence: Presence,
    send_timeout: Duration,
}

impl RealtimeCore {
    pub fn new(send_timeout: Duration) -> Self {
        let sessions = Arc::new(ConnectionRegistry::new());
        Self {
            presence: Presence::new(sessions.clone(), send_timeout),
            sessions,
            send_timeout,
        }
    }

    /// Install `conn` for `user` and announce it. A replaced session is closed
    /// by the registry; its own teardown will not emit `offline`.
    pub async fn register(&self, user: &str, conn: Connection) {
        if let Some(old) = self.sessions.register(user, conn) {
            tracing::info!(user, replaced = old.session_id, "session replaced");
        }
        self.presence.notify_status(user, PresenceStatus::Online).await;
    }

    /// Drop `user`'s session if `session_id` is still current, announcing
    /// `offline` only when something was actually removed.
    pub async fn unregister(&self, user: &str, session_id: u64) -> bool {
        let removed = self.sessions.unregister(user, session_id);
        if removed {
            self.presence
                .notify_status(user, PresenceStatus::Offline)
                .await;
        }
        removed
    }

    pub async fn send_to_user(&self, user: &str, ev: &Event) -> Result<Delivery> {
        let prepared = PreparedMsg::prepare(ev)?;
        Ok(self.send_prepared(user, &prepared).await)
    }

    /// A lookup miss is not an error: the recipient is offline and the event
    /// is dropped.
    pub async fn send_prepared(&self, user: &str, msg: &PreparedMsg) -> Delivery {
        let Some(conn) = self.sessions.lookup(user) else {
            return Delivery::Offline;
        };
        if conn
            .send_within(msg.to_ws_message(), self.send_timeout)
            .await
        {
            Delivery::Queued
        } else {
            tracing::warn!(user, "send deadline exceeded, closing session");
            Delivery::Failed
        }
    }

    /// Force-close `user`'s live session. Its own loop unregisters it.
    pub fn disconnect(&self, user: &str) -> bool {
        self.sessions
            .lookup(user)
            .map(|c| c.close())
            .unwrap_or(false)
    }

    pub fn online(&self) -> Vec<(String, Connection)> {
        self.sessions.snapshot(None)
    }

    pub fn shutdown(&self) -> usize {
        self.sessions.close_all()
    }
}

/// Per-session context passed to services.
#[derive(Clone)]
pub struct RealtimeCtx {
    user: Arc<str>,
    session_id: u64,
    core: Arc<RealtimeCore>,
}

impl RealtimeCtx {
    pub fn new(user: impl Into<Arc<str>>, session_id: u64, core: Arc<RealtimeCore>) -> Self {
        Self {
            user: user.into(),
            session_id,
            core,
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn core(&self) -> &RealtimeCore {
        &self.core
    }

    pub async fn reply(&self, ev: &Event) -> Result<Delivery> {
        self.core.send_to_user(&self.user, ev).await
    }

    pub async fn send_to(&self, user: &str, ev: &Event) -> Result<Delivery> {
        self.core.send_to_user(user, ev).await
    }

    /// Close this session only (not a newer one for the same user).
    pub fn close_session(&self) {
        if let Some(conn) = self.core.sessions.lookup(&self.user) {
            if conn.session_id == self.session_id {
                conn.close();
            }
        }
    }
}
