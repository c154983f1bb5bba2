//! Session coordinator.
//!
//! The single-writer façade for one session: every read and write of that
//! session's ledger and analytics goes through one FIFO lock.

use super::aggregator::AnalyticsAggregator;
use super::ledger::{Appended, ConversationLedger};
use parley_core::analytics::Analytics;
use parley_core::clock::Clock;
use parley_core::error::Result;
use parley_core::session::{Message, MessageRole, SessionId, SessionStore, SessionTranscript};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// State only touched while holding the session lock.
#[derive(Debug, Default)]
struct CoordinatorState {
    /// Set when an analytics write failed after its ledger write succeeded.
    analytics_suspect: bool,
}

/// Serializes all operations against one session.
///
/// `SessionCoordinator` is responsible for:
/// - Running each ledger append and its analytics update as one critical
///   section, so concurrent appends can never lose one another
/// - Executing operations in the order they were submitted (the lock is a
///   fair FIFO queue)
/// - Writing the ledger before analytics, and repairing analytics when that
///   second write fails
///
/// There must be at most one coordinator per session identifier in a
/// process; `SessionRegistry` enforces that.
pub struct SessionCoordinator {
    session_id: SessionId,
    ledger: ConversationLedger,
    aggregator: AnalyticsAggregator,
    clock: Arc<dyn Clock>,
    state: Mutex<CoordinatorState>,
}

impl SessionCoordinator {
    pub fn new(session_id: SessionId, store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            session_id,
            ledger: ConversationLedger::new(store.clone(), clock.clone()),
            aggregator: AnalyticsAggregator::new(store),
            clock,
            state: Mutex::new(CoordinatorState::default()),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Returns the full history in append order (empty for a new session).
    pub async fn get_history(&self) -> Result<Vec<Message>> {
        let _state = self.state.lock().await;
        self.ledger.list_messages(&self.session_id).await
    }

    /// Records a user turn and returns the stored message.
    pub async fn submit_user_message(&self, content: impl Into<String>) -> Result<Message> {
        Ok(self.submit(MessageRole::User, content.into()).await?.message)
    }

    /// Records a user turn and also returns the history as written.
    ///
    /// Lets the dispatcher build inference context from exactly the ledger
    /// state its own append produced.
    pub async fn submit_user_turn(&self, content: impl Into<String>) -> Result<Appended> {
        self.submit(MessageRole::User, content.into()).await
    }

    /// Records an assistant reply and returns the stored message.
    pub async fn submit_assistant_message(&self, content: impl Into<String>) -> Result<Message> {
        Ok(self.submit(MessageRole::Assistant, content.into()).await?.message)
    }

    /// Empties the ledger and resets analytics.
    pub async fn clear_session(&self) -> Result<()> {
        let mut state = self.state.lock().await;

        self.ledger.clear(&self.session_id).await?;

        if let Err(e) = self.aggregator.reset(&self.session_id).await {
            state.analytics_suspect = true;
            tracing::warn!(
                session_id = %self.session_id,
                error = %e,
                "[Coordinator] Ledger cleared but analytics reset failed"
            );
            return Err(e);
        }

        state.analytics_suspect = false;
        tracing::info!(session_id = %self.session_id, "[Coordinator] Session cleared");
        Ok(())
    }

    /// Returns the current analytics, rebuilt from the ledger first if the
    /// stored record has fallen out of step with it.
    pub async fn get_analytics(&self) -> Result<Analytics> {
        let mut state = self.state.lock().await;
        self.current_analytics(&mut state, None).await
    }

    /// Reads history and analytics under one lock acquisition, so the pair
    /// always describes the same ledger state.
    pub async fn snapshot(&self) -> Result<(Vec<Message>, Analytics)> {
        let mut state = self.state.lock().await;
        let messages = self.ledger.list_messages(&self.session_id).await?;
        let analytics = self.current_analytics(&mut state, Some(&messages)).await?;
        Ok((messages, analytics))
    }

    /// Builds a serializable transcript from a [`snapshot`](Self::snapshot).
    pub async fn export(&self) -> Result<SessionTranscript> {
        let (messages, analytics) = self.snapshot().await?;

        Ok(SessionTranscript {
            session_id: self.session_id.clone(),
            messages,
            analytics,
            exported_at: self.clock.now(),
        })
    }

    async fn submit(&self, role: MessageRole, content: String) -> Result<Appended> {
        let mut state = self.state.lock().await;

        let appended = self
            .ledger
            .append_message(&self.session_id, role, content)
            .await?;

        match self
            .aggregator
            .on_message_appended(&self.session_id, &appended.message, &appended.history)
            .await
        {
            Ok(analytics) => {
                state.analytics_suspect = false;
                debug_assert_eq!(
                    analytics.total_messages,
                    analytics.user_messages + analytics.assistant_messages
                );
                Ok(appended)
            }
            Err(e) => {
                state.analytics_suspect = true;
                tracing::warn!(
                    session_id = %self.session_id,
                    message_id = %appended.message.id,
                    error = %e,
                    "[Coordinator] Message stored but analytics update failed"
                );
                Err(e)
            }
        }
    }

    /// Reads analytics, checked against the ledger.
    ///
    /// The stored counters are compared with the history on every read, so a
    /// lost analytics write is repaired even when this coordinator never saw
    /// it fail (another process, or a coordinator since evicted).
    async fn current_analytics(
        &self,
        state: &mut MutexGuard<'_, CoordinatorState>,
        history: Option<&[Message]>,
    ) -> Result<Analytics> {
        let loaded;
        let history: &[Message] = match history {
            Some(history) => history,
            None => {
                loaded = self.ledger.list_messages(&self.session_id).await?;
                loaded.as_slice()
            }
        };

        let analytics = if state.analytics_suspect {
            tracing::warn!(
                session_id = %self.session_id,
                "[Coordinator] Rebuilding analytics after failed write"
            );
            self.aggregator.rebuild(&self.session_id, history).await?
        } else {
            self.aggregator
                .get_verified(&self.session_id, history)
                .await?
        };
        state.analytics_suspect = false;
        Ok(analytics)
    }
}
