use std::sync::Arc;
use std::time::Duration;

use relayhub_core::protocol::{Event, PresenceEvent, PresenceStatus};

use crate::realtime::core::registry::{BroadcastReport, ConnectionRegistry};
use crate::realtime::types::PreparedMsg;

/// Online/offline fan-out over the registry.
pub struct Presence {
    sessions: Arc<ConnectionRegistry>,
    deadline: Duration,
}

impl Presence {
    pub fn new(sessions: Arc<ConnectionRegistry>, deadline: Duration) -> Self {
        Self { sessions, deadline }
    }

    /// Send `user_status` to every registered connection other than `user`.
    pub async fn notify_status(&self, user: &str, status: PresenceStatus) -> BroadcastReport {
        let ev = Event::UserStatus(PresenceEvent {
            user_id: user.to_string(),
            status,
        });
        let prepared = match PreparedMsg::prepare(&ev) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "presence event encode failed");
                return BroadcastReport::default();
            }
        };

        let report = self
            .sessions
            .broadcast(Some(user), &prepared, self.deadline)
            .await;
        tracing::debug!(
            user,
            status = ?status,
            delivered = report.delivered,
            failed = report.failed,
            "presence broadcast"
        );
        report
    }
}
