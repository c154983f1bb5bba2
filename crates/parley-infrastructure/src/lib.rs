//! Infrastructure layer for Parley.
//!
//! Concrete `SessionStore` backends, file-system paths and configuration
//! loading.

pub mod config_service;
pub mod json_dir_session_store;
pub mod memory_session_store;
pub mod paths;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::json_dir_session_store::JsonDirSessionStore;
pub use crate::memory_session_store::InMemorySessionStore;

use parley_core::config::{StorageBackend, StorageConfig};
use parley_core::error::Result;
use parley_core::session::SessionStore;
use std::sync::Arc;

/// Builds the session store selected by configuration.
///
/// # Errors
///
/// Returns an error if the JSON directory backend cannot create its
/// directory or no data directory can be resolved.
pub async fn build_session_store(config: &StorageConfig) -> Result<Arc<dyn SessionStore>> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory session store");
            Ok(Arc::new(InMemorySessionStore::new()))
        }
        StorageBackend::JsonDir => {
            let store = match &config.data_dir {
                Some(dir) => JsonDirSessionStore::new(dir).await?,
                None => JsonDirSessionStore::default_location().await?,
            };
            tracing::info!(
                "Using JSON session store at {}",
                store.sessions_dir().display()
            );
            Ok(Arc::new(store))
        }
    }
}
