//! Session store trait.
//!
//! Defines the key-value persistence contract every session record goes
//! through.

use super::id::SessionId;
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;

/// The logical records kept per session.
///
/// Each record is stored and retrieved independently; only a session clear
/// resets both together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKey {
    /// The ordered message list.
    Messages,
    /// The derived analytics record.
    Analytics,
}

impl RecordKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKey::Messages => "messages",
            RecordKey::Analytics => "analytics",
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An abstract durable store keyed by session identifier.
///
/// This trait decouples the ledger and aggregator from the specific storage
/// mechanism (in-memory map, JSON files, remote KV).
///
/// # Implementation Notes
///
/// Implementations must provide:
/// - Read-after-write consistency per session and key
/// - All-or-nothing puts: a failed put leaves the previous value intact
///
/// Serializing concurrent writers is not the store's job; the session
/// coordinator owns that.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Reads one record.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(value))`: Record found
    /// - `Ok(None)`: Nothing stored yet for this session and key
    /// - `Err(_)`: Storage failure
    async fn get(&self, session_id: &SessionId, key: RecordKey) -> Result<Option<Value>>;

    /// Replaces one record.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Value durably stored
    /// - `Err(_)`: Storage failure; the previous value is still in place
    async fn put(&self, session_id: &SessionId, key: RecordKey, value: Value) -> Result<()>;

    /// Lists the identifiers of all sessions with at least one stored record.
    async fn list_sessions(&self) -> Result<Vec<String>>;
}

/// Loads and decodes a typed record.
pub async fn load_record<T>(
    store: &dyn SessionStore,
    session_id: &SessionId,
    key: RecordKey,
) -> Result<Option<T>>
where
    T: DeserializeOwned,
{
    match store.get(session_id, key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Encodes and stores a typed record.
pub async fn save_record<T>(
    store: &dyn SessionStore,
    session_id: &SessionId,
    key: RecordKey,
    record: &T,
) -> Result<()>
where
    T: Serialize + Sync,
{
    let value = serde_json::to_value(record)?;
    store.put(session_id, key, value).await
}
