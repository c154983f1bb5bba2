//! Analytics aggregator.
//!
//! Keeps a session's `analytics` record in step with its ledger, one append
//! at a time.

use parley_core::analytics::Analytics;
use parley_core::error::Result;
use parley_core::session::{Message, RecordKey, SessionId, SessionStore, load_record, save_record};
use std::sync::Arc;

/// Maintains the derived `analytics` record of a session.
pub struct AnalyticsAggregator {
    store: Arc<dyn SessionStore>,
}

impl AnalyticsAggregator {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Returns the stored analytics, or the zeroed default.
    pub async fn get(&self, session_id: &SessionId) -> Result<Analytics> {
        let analytics: Option<Analytics> =
            load_record(self.store.as_ref(), session_id, RecordKey::Analytics).await?;
        Ok(analytics.unwrap_or_default())
    }

    /// Folds a freshly appended message into the stored analytics.
    ///
    /// `history` is the ledger as written by the append, ending with
    /// `message`. If the stored counters do not match the history that
    /// preceded this append (an earlier analytics write was lost), the record
    /// is rebuilt from `history` instead of incremented.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the record cannot be read or written.
    pub async fn on_message_appended(
        &self,
        session_id: &SessionId,
        message: &Message,
        history: &[Message],
    ) -> Result<Analytics> {
        let mut analytics = self.get(session_id).await?;
        let prior = &history[..history.len().saturating_sub(1)];

        if analytics.is_consistent_with(prior) {
            analytics.record(message, history);
        } else {
            tracing::warn!(
                session_id = %session_id,
                stored_total = analytics.total_messages,
                ledger_len = prior.len(),
                "[Aggregator] Analytics out of step with ledger, rebuilding"
            );
            analytics = Analytics::rebuild(history);
        }

        self.save(session_id, &analytics).await?;
        Ok(analytics)
    }

    /// Returns the stored analytics after checking them against `history`.
    ///
    /// A record whose counters disagree with the ledger (its last write was
    /// lost, possibly by another process) is rebuilt and stored again.
    pub async fn get_verified(
        &self,
        session_id: &SessionId,
        history: &[Message],
    ) -> Result<Analytics> {
        let analytics = self.get(session_id).await?;
        if analytics.is_consistent_with(history) {
            return Ok(analytics);
        }

        tracing::warn!(
            session_id = %session_id,
            stored_total = analytics.total_messages,
            ledger_len = history.len(),
            "[Aggregator] Stored analytics out of step with ledger, rebuilding"
        );
        self.rebuild(session_id, history).await
    }

    /// Stores the zeroed default.
    pub async fn reset(&self, session_id: &SessionId) -> Result<()> {
        self.save(session_id, &Analytics::default()).await
    }

    /// Recomputes analytics from a full history and stores the result.
    pub async fn rebuild(&self, session_id: &SessionId, history: &[Message]) -> Result<Analytics> {
        let analytics = Analytics::rebuild(history);
        self.save(session_id, &analytics).await?;
        Ok(analytics)
    }

    async fn save(&self, session_id: &SessionId, analytics: &Analytics) -> Result<()> {
        save_record(self.store.as_ref(), session_id, RecordKey::Analytics, analytics).await
    }
}
