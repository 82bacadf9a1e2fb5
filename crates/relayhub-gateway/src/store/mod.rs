//! Persistence collaborator.
//!
//! The hub issues one logical write per message and never spans a transaction
//! across calls; implementations serialize their own writes.

mod memory;

use async_trait::async_trait;

use relayhub_core::error::Result;
use relayhub_core::protocol::ChatMessage;

pub use memory::MemoryStore;

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn save_message(&self, msg: &ChatMessage) -> Result<()>;

    /// Oldest first. `limit == 0` returns the whole conversation, otherwise
    /// the most recent `limit` messages.
    async fn load_conversation(&self, a: &str, b: &str, limit: usize) -> Result<Vec<ChatMessage>>;

    async fn mark_read(&self, message_id: &str) -> Result<()>;

    async fn unread_count(&self, user_id: &str) -> Result<usize>;

    /// Liveness of the store itself (application tier of the health cascade).
    async fn ping(&self) -> Result<()>;

    /// Administrative erase of everything the user sent or received.
    async fn delete_user_messages(&self, user_id: &str) -> Result<usize>;
}
