//! Directory-backed SessionStore implementation.
//!
//! Every record is a standalone JSON file replaced atomically on each put.

use crate::storage::{AtomicJsonFile, decode_session_dir, encode_session_dir};
use async_trait::async_trait;
use parley_core::error::{ParleyError, Result};
use parley_core::session::{RecordKey, SessionId, SessionStore};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;

/// JSON-file session store.
///
/// Directory structure:
/// ```text
/// base_dir/
/// └── sessions/
///     ├── <encoded-session-id>/
///     │   ├── messages.json
///     │   └── analytics.json
///     └── <encoded-session-id>/
///         └── ...
/// ```
///
/// The `messages` and `analytics` records live in separate files so each
/// can be written and read on its own.
pub struct JsonDirSessionStore {
    sessions_dir: PathBuf,
}

impl JsonDirSessionStore {
    /// Creates a store at the default location (`<data dir>/parley`).
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be determined or created.
    pub async fn default_location() -> Result<Self> {
        use crate::paths::ParleyPaths;
        let base_dir = ParleyPaths::data_dir()
            .map_err(|e| ParleyError::config(format!("Failed to get data directory: {}", e)))?;
        Self::new(base_dir).await
    }

    /// Creates a store rooted at `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns error if the sessions directory cannot be created.
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let sessions_dir = base_dir.as_ref().join("sessions");
        fs::create_dir_all(&sessions_dir).await.map_err(|e| {
            ParleyError::storage(format!(
                "Failed to create sessions directory {}: {}",
                sessions_dir.display(),
                e
            ))
        })?;

        Ok(Self { sessions_dir })
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    fn record_file(&self, session_id: &SessionId, key: RecordKey) -> AtomicJsonFile {
        let path = self
            .sessions_dir
            .join(encode_session_dir(session_id.as_str()))
            .join(format!("{}.json", key.as_str()));
        AtomicJsonFile::new(path)
    }
}

/// Runs blocking file work off the async runtime.
async fn blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ParleyError::internal(format!("Storage task failed: {}", e)))?
}

#[async_trait]
impl SessionStore for JsonDirSessionStore {
    async fn get(&self, session_id: &SessionId, key: RecordKey) -> Result<Option<Value>> {
        let file = self.record_file(session_id, key);
        blocking(move || file.load()).await
    }

    async fn put(&self, session_id: &SessionId, key: RecordKey, value: Value) -> Result<()> {
        let file = self.record_file(session_id, key);
        tracing::trace!(
            session_id = %session_id,
            key = %key,
            path = %file.path().display(),
            "Writing session record"
        );
        blocking(move || file.save(&value)).await
    }

    async fn list_sessions(&self) -> Result<Vec<String>> {
        let mut entries = match fs::read_dir(&self.sessions_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            match name.to_str().and_then(decode_session_dir) {
                Some(id) => ids.push(id),
                None => tracing::debug!("Skipping foreign entry in sessions dir: {:?}", name),
            }
        }

        ids.sort();
        Ok(ids)
    }
}
