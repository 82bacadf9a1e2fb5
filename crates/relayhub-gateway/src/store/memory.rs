use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use relayhub_core::error::{RelayError, Result};
use relayhub_core::protocol::{ChatMessage, ConversationKey};

use super::MessageStore;

/// In-process store: `conversation -> messages` plus `message_id -> conversation`.
#[derive(Default)]
pub struct MemoryStore {
    conversations: DashMap<ConversationKey, Vec<ChatMessage>>,
    index: DashMap<String, ConversationKey>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every call fails with `RelayError::Store`.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::Relaxed);
    }

    fn check(&self) -> Result<()> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(RelayError::Store("store unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn save_message(&self, msg: &ChatMessage) -> Result<()> {
        self.check()?;
        let key = msg.conversation_key();
        self.index.insert(msg.id.clone(), key.clone());
        self.conversations.entry(key).or_default().push(msg.clone());
        Ok(())
    }

    async fn load_conversation(&self, a: &str, b: &str, limit: usize) -> Result<Vec<ChatMessage>> {
        self.check()?;
        let key = ConversationKey::new(a, b);
        let Some(msgs) = self.conversations.get(&key) else {
            return Ok(Vec::new());
        };
        let mut out: Vec<ChatMessage> =
            msgs.value().iter().filter(|m| key.covers(m)).cloned().collect();
        drop(msgs);
        out.sort_by_key(|m| m.timestamp);
        if limit > 0 && out.len() > limit {
            out.drain(..out.len() - limit);
        }
        Ok(out)
    }

    async fn mark_read(&self, message_id: &str) -> Result<()> {
        self.check()?;
        let key = self
            .index
            .get(message_id)
            .map(|k| k.value().clone())
            .ok_or_else(|| RelayError::NotFound(format!("message {message_id}")))?;
        if let Some(mut msgs) = self.conversations.get_mut(&key) {
            if let Some(m) = msgs.iter_mut().find(|m| m.id == message_id) {
                m.read = true;
                return Ok(());
            }
        }
        Err(RelayError::NotFound(format!("message {message_id}")))
    }

    async fn unread_count(&self, user_id: &str) -> Result<usize> {
        self.check()?;
        Ok(self
            .conversations
            .iter()
            .map(|c| c.value().iter().filter(|m| m.to_id == user_id && !m.read).count())
            .sum())
    }

    async fn ping(&self) -> Result<()> {
        self.check()
    }

    async fn delete_user_messages(&self, user_id: &str) -> Result<usize> {
        self.check()?;
        let mut removed: Vec<String> = Vec::new();
        self.conversations.retain(|_, msgs| {
            msgs.retain(|m| {
                let owned = m.from_id == user_id || m.to_id == user_id;
                if owned {
                    removed.push(m.id.clone());
                }
                !owned
            });
            !msgs.is_empty()
        });
        for id in &removed {
            self.index.remove(id);
        }
        Ok(removed.len())
    }
}
