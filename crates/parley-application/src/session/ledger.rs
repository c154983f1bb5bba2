//! Conversation ledger.
//!
//! This module provides `ConversationLedger`, the read-modify-write path for
//! a session's ordered message list.

use parley_core::clock::Clock;
use parley_core::error::Result;
use parley_core::session::{
    Message, MessageRole, RecordKey, SessionId, SessionStore, load_record, save_record,
};
use std::sync::Arc;
use uuid::Uuid;

/// The result of one append: the stored message and the full history as it
/// was written, ending with that message.
#[derive(Debug, Clone, PartialEq)]
pub struct Appended {
    pub message: Message,
    pub history: Vec<Message>,
}

impl Appended {
    /// The history as it stood before this append.
    pub fn prior(&self) -> &[Message] {
        &self.history[..self.history.len().saturating_sub(1)]
    }
}

/// Owns the `messages` record of a session.
///
/// Every append is "load full history → push → store full history". The
/// ledger does not serialize concurrent appends itself; callers go through
/// `SessionCoordinator`, which does.
pub struct ConversationLedger {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
}

impl ConversationLedger {
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Returns the full history in append order, empty if nothing is stored.
    pub async fn list_messages(&self, session_id: &SessionId) -> Result<Vec<Message>> {
        let messages: Option<Vec<Message>> =
            load_record(self.store.as_ref(), session_id, RecordKey::Messages).await?;
        Ok(messages.unwrap_or_default())
    }

    /// Stamps and appends a message, then persists the updated history.
    ///
    /// The timestamp is never earlier than the latest stored one, so append
    /// order and timestamp order agree even if the wall clock steps back.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the history cannot be read or written.
    /// Nothing is stored in that case.
    pub async fn append_message(
        &self,
        session_id: &SessionId,
        role: MessageRole,
        content: impl Into<String>,
    ) -> Result<Appended> {
        let mut history = self.list_messages(session_id).await?;

        let mut timestamp = self.clock.now();
        if let Some(latest) = history.iter().rev().find_map(|m| m.timestamp) {
            if timestamp < latest {
                tracing::debug!(
                    session_id = %session_id,
                    "[Ledger] Clock behind latest message, clamping timestamp"
                );
                timestamp = latest;
            }
        }

        let message = Message {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Some(timestamp),
        };
        history.push(message.clone());

        save_record(self.store.as_ref(), session_id, RecordKey::Messages, &history).await?;

        tracing::debug!(
            session_id = %session_id,
            role = %role,
            len = history.len(),
            "[Ledger] Appended message"
        );

        Ok(Appended { message, history })
    }

    /// Replaces the history with an empty one.
    pub async fn clear(&self, session_id: &SessionId) -> Result<()> {
        let empty: Vec<Message> = Vec::new();
        save_record(self.store.as_ref(), session_id, RecordKey::Messages, &empty).await
    }
}
