//! Session registry.
//!
//! Resolves session identifiers to their one `SessionCoordinator`.

use super::coordinator::SessionCoordinator;
use super::ledger::Appended;
use parley_core::analytics::Analytics;
use parley_core::clock::{Clock, SystemClock};
use parley_core::error::Result;
use parley_core::session::{Message, SessionId, SessionStore, SessionTranscript};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Hands out the single coordinator for each session.
///
/// `SessionRegistry` is responsible for:
/// - Lazily creating one `SessionCoordinator` per session identifier
/// - Guaranteeing every caller in the process shares that instance
/// - Exposing the session operations by identifier
///
/// Coordinators for different sessions never share a lock, so work on one
/// session does not wait on another.
pub struct SessionRegistry {
    /// Live coordinators keyed by session
    coordinators: RwLock<HashMap<SessionId, Arc<SessionCoordinator>>>,
    /// Storage shared by every coordinator
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
}

impl SessionRegistry {
    /// Creates a registry that stamps messages with the system clock.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            coordinators: RwLock::new(HashMap::new()),
            store,
            clock,
        }
    }

    /// Returns the coordinator for `session_id`, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSession` if the identifier is blank.
    pub async fn coordinator(&self, session_id: &str) -> Result<Arc<SessionCoordinator>> {
        let session_id = SessionId::new(session_id)?;

        {
            let coordinators = self.coordinators.read().await;
            if let Some(existing) = coordinators.get(&session_id) {
                return Ok(existing.clone());
            }
        }

        let mut coordinators = self.coordinators.write().await;
        // Another task may have inserted between the two locks.
        let coordinator = coordinators
            .entry(session_id.clone())
            .or_insert_with(|| {
                tracing::info!(session_id = %session_id, "[Registry] Created session coordinator");
                Arc::new(SessionCoordinator::new(
                    session_id.clone(),
                    self.store.clone(),
                    self.clock.clone(),
                ))
            })
            .clone();

        Ok(coordinator)
    }

    pub async fn get_history(&self, session_id: &str) -> Result<Vec<Message>> {
        self.coordinator(session_id).await?.get_history().await
    }

    pub async fn submit_user_message(
        &self,
        session_id: &str,
        content: impl Into<String>,
    ) -> Result<Message> {
        self.coordinator(session_id)
            .await?
            .submit_user_message(content)
            .await
    }

    pub async fn submit_user_turn(
        &self,
        session_id: &str,
        content: impl Into<String>,
    ) -> Result<Appended> {
        self.coordinator(session_id)
            .await?
            .submit_user_turn(content)
            .await
    }

    pub async fn submit_assistant_message(
        &self,
        session_id: &str,
        content: impl Into<String>,
    ) -> Result<Message> {
        self.coordinator(session_id)
            .await?
            .submit_assistant_message(content)
            .await
    }

    pub async fn clear_session(&self, session_id: &str) -> Result<()> {
        self.coordinator(session_id).await?.clear_session().await
    }

    pub async fn get_analytics(&self, session_id: &str) -> Result<Analytics> {
        self.coordinator(session_id).await?.get_analytics().await
    }

    pub async fn export(&self, session_id: &str) -> Result<SessionTranscript> {
        self.coordinator(session_id).await?.export().await
    }

    /// Lists every session with stored data, whether or not it is loaded.
    pub async fn list_sessions(&self) -> Result<Vec<String>> {
        self.store.list_sessions().await
    }

    /// Drops coordinators nobody outside the registry holds.
    ///
    /// A coordinator that is still referenced keeps its slot, so two live
    /// coordinators for one session can never coexist.
    pub async fn evict_idle(&self) -> usize {
        let mut coordinators = self.coordinators.write().await;
        let before = coordinators.len();
        coordinators.retain(|_, coordinator| Arc::strong_count(coordinator) > 1);
        let evicted = before - coordinators.len();
        if evicted > 0 {
            tracing::debug!(evicted, "[Registry] Evicted idle coordinators");
        }
        evicted
    }

    /// Number of coordinators currently loaded.
    pub async fn len(&self) -> usize {
        self.coordinators.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.coordinators.read().await.is_empty()
    }
}
