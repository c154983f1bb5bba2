//! Configuration service implementation.
//!
//! Loads the root configuration from `config.toml` and applies environment
//! overrides on top.

use crate::paths::ParleyPaths;
use parley_core::config::RootConfig;
use parley_core::error::{ParleyError, Result};
use std::path::{Path, PathBuf};

/// Relocates session data.
pub const DATA_DIR_ENV: &str = "PARLEY_DATA_DIR";
/// Overrides `inference.model`.
pub const MODEL_ENV: &str = "PARLEY_MODEL";
/// Overrides `inference.base_url`.
pub const BASE_URL_ENV: &str = "PARLEY_BASE_URL";
/// Overrides `logging.level`.
pub const LOG_LEVEL_ENV: &str = "PARLEY_LOG_LEVEL";

/// Loads [`RootConfig`] from disk.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
}

impl ConfigService {
    /// Uses an explicit config file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Uses `~/.config/parley/config.toml`.
    pub fn default_location() -> Result<Self> {
        let path = ParleyPaths::config_file()
            .map_err(|e| ParleyError::config(format!("Failed to locate config file: {}", e)))?;
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the configuration with process environment overrides applied.
    pub fn load(&self) -> Result<RootConfig> {
        self.load_with_env(|name| std::env::var(name).ok())
    }

    /// Loads the configuration, resolving overrides through `env`.
    ///
    /// A missing or blank file yields the defaults. A file that exists but
    /// does not parse is an error.
    pub fn load_with_env<F>(&self, env: F) -> Result<RootConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => RootConfig::default(),
            Ok(content) => toml::from_str(&content).map_err(|e| {
                ParleyError::config(format!("Failed to parse {}: {}", self.path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config file at {}, using defaults", self.path.display());
                RootConfig::default()
            }
            Err(e) => {
                return Err(ParleyError::config(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        apply_env_overrides(&mut config, env);
        Ok(config)
    }
}

fn apply_env_overrides<F>(config: &mut RootConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| env(name).filter(|value| !value.trim().is_empty());

    if let Some(dir) = non_empty(DATA_DIR_ENV) {
        config.storage.data_dir = Some(PathBuf::from(dir));
    }
    if let Some(model) = non_empty(MODEL_ENV) {
        config.inference.model = model;
    }
    if let Some(url) = non_empty(BASE_URL_ENV) {
        config.inference.base_url = url;
    }
    if let Some(level) = non_empty(LOG_LEVEL_ENV) {
        config.logging.level = level;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::config::StorageBackend;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let service = ConfigService::new(temp.path().join("config.toml"));
        assert_eq!(service.load_with_env(no_env).unwrap(), RootConfig::default());
    }

    #[test]
    fn test_reads_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            "[storage]\nbackend = \"memory\"\n\n[inference]\ntimeout_secs = 3\n",
        )
        .unwrap();

        let config = ConfigService::new(path).load_with_env(no_env).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.inference.timeout_secs, 3);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[storage\nbackend = ").unwrap();

        let err = ConfigService::new(path).load_with_env(no_env).unwrap_err();
        assert!(matches!(err, ParleyError::Config(_)));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[inference]\nmodel = \"from-file\"\n").unwrap();

        let env: HashMap<&str, &str> = HashMap::from([
            (MODEL_ENV, "from-env"),
            (DATA_DIR_ENV, "/tmp/parley-data"),
            (LOG_LEVEL_ENV, ""),
        ]);
        let config = ConfigService::new(path)
            .load_with_env(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.inference.model, "from-env");
        assert_eq!(
            config.storage.data_dir,
            Some(PathBuf::from("/tmp/parley-data"))
        );
        // Blank overrides are ignored
        assert_eq!(config.logging.level, "info");
    }
}
