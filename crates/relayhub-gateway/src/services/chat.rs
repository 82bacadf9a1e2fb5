use std::sync::Arc;

use relayhub_core::error::{RelayError, Result};
use relayhub_core::protocol::{ChatMessage, Event, ReadNotice, ReadReceipt, SendMessage};

use crate::realtime::{Delivery, RealtimeCtx};
use crate::store::MessageStore;

/// Text messages and read receipts.
pub struct ChatService {
    store: Arc<dyn MessageStore>,
}

impl ChatService {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    /// Stamp, persist, then acknowledge to the sender and deliver to the
    /// recipient. Nothing is relayed if the write fails.
    pub async fn send(&self, ctx: &RealtimeCtx, req: SendMessage) -> Result<Delivery> {
        let msg = ChatMessage::stamp(ctx.user(), req);
        self.store.save_message(&msg).await?;

        let to = msg.to_id.clone();
        let ack = Event::MessageSent(msg.clone());
        let delivered = Event::NewMessage(msg);

        ctx.reply(&ack).await?;
        let delivery = ctx.send_to(&to, &delivered).await?;
        if delivery == Delivery::Offline {
            tracing::debug!(to = %to, "recipient offline, not delivered");
        }
        Ok(delivery)
    }

    /// Mark read, then notify the original sender only.
    pub async fn read(&self, ctx: &RealtimeCtx, receipt: ReadReceipt) -> Result<Delivery> {
        if let Some(claimed) = receipt.user_id.as_deref() {
            if claimed != ctx.user() {
                return Err(RelayError::BadRequest(
                    "read receipt userId does not match session".into(),
                ));
            }
        }

        self.store.mark_read(&receipt.message_id).await?;

        let notice = Event::MessageRead(ReadNotice {
            message_id: receipt.message_id,
            read_by: ctx.user().to_string(),
        });
        ctx.send_to(&receipt.other_id, &notice).await
    }
}
