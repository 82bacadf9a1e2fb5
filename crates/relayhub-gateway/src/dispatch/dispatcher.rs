use std::sync::Arc;

use relayhub_core::error::{RelayError, Result};
use relayhub_core::protocol::Inbound;

use crate::realtime::RealtimeCtx;
use crate::services::{CallService, ChatService};
use crate::store::MessageStore;

/// What the session loop should do after a frame was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The client asked to leave; tear the session down.
    Close,
}

/// Type-tagged switch over decoded client envelopes.
pub struct Dispatcher {
    chat: ChatService,
    call: CallService,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self {
            chat: ChatService::new(store),
            call: CallService::new(),
        }
    }

    /// Handle one inbound envelope for `ctx.user()`. Failures are logged here
    /// and never terminate the session.
    pub async fn dispatch(&self, ctx: &RealtimeCtx, inbound: Inbound) -> Flow {
        let kind = inbound.kind().to_string();
        match self.route(ctx, inbound).await {
            Ok(flow) => flow,
            Err(RelayError::NotFound(what)) => {
                tracing::debug!(kind = %kind, %what, "target not found, nothing relayed");
                Flow::Continue
            }
            Err(e) => {
                tracing::warn!(kind = %kind, code = e.client_code().as_str(), error = %e, "dispatch failed");
                Flow::Continue
            }
        }
    }

    async fn route(&self, ctx: &RealtimeCtx, inbound: Inbound) -> Result<Flow> {
        match inbound {
            Inbound::Message(req) => {
                self.chat.send(ctx, req).await?;
            }
            Inbound::Read(receipt) => {
                self.chat.read(ctx, receipt).await?;
            }
            Inbound::Call(phase, signal) => {
                self.call.relay(ctx, phase, signal).await?;
            }
            Inbound::Disconnect => {
                tracing::info!("client requested disconnect");
                return Ok(Flow::Close);
            }
            Inbound::Ping => {}
            Inbound::Unknown(t) => {
                tracing::debug!(msg_type = %t, "unknown envelope type ignored");
            }
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::extract::ws::Message;
    use tokio::sync::mpsc;

    use crate::realtime::{Connection, RealtimeCore};
    use crate::store::MemoryStore;

    struct Peer {
        ctx: RealtimeCtx,
        rx: mpsc::Receiver<Message>,
    }

    async fn join(core: &Arc<RealtimeCore>, user: &str) -> Peer {
        let (tx, rx) = mpsc::channel(16);
        let sid = core.sessions.next_session_id();
        let (conn, _closed) = Connection::new(sid, user, tx);
        core.register(user, conn).await;
        Peer {
            ctx: RealtimeCtx::new(user, sid, core.clone()),
            rx,
        }
    }

    fn drain(rx: &mut mpsc::Receiver<Message>) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        while let Ok(Message::Text(t)) = rx.try_recv() {
            out.push(serde_json::from_str(&t).unwrap());
        }
        out
    }

    fn inbound(raw: &str) -> Inbound {
        Inbound::decode(raw).unwrap()
    }

    #[tokio::test]
    async fn message_acks_sender_and_delivers_to_recipient() {
        let store = Arc::new(MemoryStore::new());
        let core = Arc::new(RealtimeCore::new(Duration::from_millis(200)));
        let d = Dispatcher::new(store.clone());
        let mut a = join(&core, "a").await;
        let mut b = join(&core, "b").await;
        drain(&mut a.rx);
        drain(&mut b.rx);

        let flow = d
            .dispatch(&a.ctx, inbound(r#"{"type":"message","payload":{"toId":"b","content":"hi"}}"#))
            .await;
        assert_eq!(flow, Flow::Continue);

        let to_a = drain(&mut a.rx);
        let to_b = drain(&mut b.rx);
        assert_eq!(to_a.len(), 1);
        assert_eq!(to_a[0]["type"], "message_sent");
        assert_eq!(to_b.len(), 1);
        assert_eq!(to_b[0]["type"], "new_message");
        assert_eq!(to_b[0]["payload"]["fromId"], "a");
        assert_eq!(to_a[0]["payload"]["id"], to_b[0]["payload"]["id"]);

        let saved = store.load_conversation("a", "b", 0).await.unwrap();
        assert_eq!(saved.len(), 1);
    }

    #[tokio::test]
    async fn store_failure_relays_nothing() {
        let store = Arc::new(MemoryStore::new());
        store.set_available(false);
        let core = Arc::new(RealtimeCore::new(Duration::from_millis(200)));
        let d = Dispatcher::new(store);
        let mut a = join(&core, "a").await;
        let mut b = join(&core, "b").await;
        drain(&mut a.rx);
        drain(&mut b.rx);

        d.dispatch(&a.ctx, inbound(r#"{"type":"message","payload":{"toId":"b","content":"hi"}}"#))
            .await;
        assert!(drain(&mut a.rx).is_empty());
        assert!(drain(&mut b.rx).is_empty());
    }

    #[tokio::test]
    async fn read_notifies_original_sender_only() {
        let store = Arc::new(MemoryStore::new());
        let core = Arc::new(RealtimeCore::new(Duration::from_millis(200)));
        let d = Dispatcher::new(store);
        let mut a = join(&core, "a").await;
        let mut b = join(&core, "b").await;
        let mut c = join(&core, "c").await;

        d.dispatch(&a.ctx, inbound(r#"{"type":"message","payload":{"toId":"b","content":"hi"}}"#))
            .await;
        drain(&mut a.rx);
        let id = drain(&mut b.rx)
            .into_iter()
            .find(|v| v["type"] == "new_message")
            .unwrap()["payload"]["id"]
            .as_str()
            .unwrap()
            .to_string();
        drain(&mut c.rx);

        let raw = format!(r#"{{"type":"read","payload":{{"messageId":"{id}","otherId":"a"}}}}"#);
        d.dispatch(&b.ctx, inbound(&raw)).await;

        let to_a = drain(&mut a.rx);
        assert_eq!(to_a.len(), 1);
        assert_eq!(to_a[0]["type"], "message_read");
        assert_eq!(to_a[0]["payload"]["messageId"], id.as_str());
        assert_eq!(to_a[0]["payload"]["readBy"], "b");
        assert!(drain(&mut b.rx).is_empty());
        assert!(drain(&mut c.rx).is_empty());
    }

    #[tokio::test]
    async fn call_signal_is_stamped_with_sender() {
        let store = Arc::new(MemoryStore::new());
        let core = Arc::new(RealtimeCore::new(Duration::from_millis(200)));
        let d = Dispatcher::new(store.clone());
        let a = join(&core, "a").await;
        let mut b = join(&core, "b").await;
        drain(&mut b.rx);

        d.dispatch(
            &a.ctx,
            inbound(r#"{"type":"call-offer","payload":{"toId":"b","fromId":"mallory","sdp":"v=0"}}"#),
        )
        .await;

        let to_b = drain(&mut b.rx);
        assert_eq!(to_b.len(), 1);
        assert_eq!(to_b[0]["type"], "call-offer");
        assert_eq!(to_b[0]["payload"]["fromId"], "a");
        assert_eq!(to_b[0]["payload"]["sdp"], "v=0");
        assert!(store.load_conversation("a", "b", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn disconnect_and_unknown() {
        let store = Arc::new(MemoryStore::new());
        let core = Arc::new(RealtimeCore::new(Duration::from_millis(200)));
        let d = Dispatcher::new(store);
        let a = join(&core, "a").await;

        assert_eq!(d.dispatch(&a.ctx, inbound(r#"{"type":"typing"}"#)).await, Flow::Continue);
        assert_eq!(d.dispatch(&a.ctx, inbound(r#"{"type":"disconnect"}"#)).await, Flow::Close);
    }
}
