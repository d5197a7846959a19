//! Runtime configuration for the sync core.
//!
//! A `CoreConfig` is read from a JSON file (every section optional) and can be
//! overridden from the environment. Front ends build an [`crate::AppContainer`]
//! from it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

/// Overrides `remote.base_url`
pub const ENV_API_URL: &str = "TASKMASTER_API_URL";
/// Overrides `local.path` and selects the SQLite backend
pub const ENV_DB_PATH: &str = "TASKMASTER_DB_PATH";

const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 15;
const DEFAULT_AUTO_SYNC_INTERVAL_SECS: u64 = 300;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CoreConfig {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub local: LocalConfig,
    #[serde(default)]
    pub sync: SyncSettings,
}

/// Remote document store endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_remote_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: DEFAULT_REMOTE_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LocalBackend {
    /// Cache lives only as long as the process
    #[default]
    Memory,
    /// Cache persisted to a SQLite file
    Sqlite,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LocalConfig {
    #[serde(default)]
    pub backend: LocalBackend,
    /// SQLite file, required for the `sqlite` backend
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SyncSettings {
    #[serde(default = "default_auto_sync_interval_secs")]
    pub auto_sync_interval_secs: u64,
    /// Capture locally-newer tasks as conflicts during pulls
    #[serde(default = "default_true")]
    pub detect_conflicts: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            auto_sync_interval_secs: DEFAULT_AUTO_SYNC_INTERVAL_SECS,
            detect_conflicts: true,
        }
    }
}

const fn default_remote_timeout_secs() -> u64 {
    DEFAULT_REMOTE_TIMEOUT_SECS
}

const fn default_auto_sync_interval_secs() -> u64 {
    DEFAULT_AUTO_SYNC_INTERVAL_SECS
}

const fn default_true() -> bool {
    true
}

impl CoreConfig {
    pub fn from_json(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Load and validate a config file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_json(&contents).map_err(|error| {
            Error::Config(format!("Failed to parse {}: {error}", path.display()))
        })?;
        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply overrides from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`; blank values are ignored.
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(base_url) = normalize_text_option(lookup(ENV_API_URL)) {
            self.remote.base_url = Some(base_url);
        }
        if let Some(path) = normalize_text_option(lookup(ENV_DB_PATH)) {
            self.local.backend = LocalBackend::Sqlite;
            self.local.path = Some(PathBuf::from(path));
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(base_url) = normalize_text_option(self.remote.base_url.clone()) {
            if !is_http_url(&base_url) {
                return Err(Error::Config(
                    "remote.base_url must include http:// or https://".to_string(),
                ));
            }
        }
        if self.remote.timeout_secs == 0 {
            return Err(Error::Config(
                "remote.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.sync.auto_sync_interval_secs == 0 {
            return Err(Error::Config(
                "sync.auto_sync_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.local.backend == LocalBackend::Sqlite && self.local.path.is_none() {
            return Err(Error::Config(
                "local.path is required for the sqlite backend".to_string(),
            ));
        }
        Ok(())
    }

    /// Configured remote base URL, if any
    pub fn remote_base_url(&self) -> Option<String> {
        normalize_text_option(self.remote.base_url.clone())
    }

    pub const fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.timeout_secs)
    }

    pub const fn auto_sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync.auto_sync_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn empty_document_uses_defaults() {
        let config = CoreConfig::from_json("{}").unwrap();

        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.auto_sync_interval(), Duration::from_secs(300));
        assert_eq!(config.remote_timeout(), Duration::from_secs(15));
        assert!(config.sync.detect_conflicts);
        assert_eq!(config.local.backend, LocalBackend::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_full_document() {
        let config = CoreConfig::from_json(
            r#"{
                "remote": { "base_url": "https://api.example.com", "timeout_secs": 5 },
                "local": { "backend": "sqlite", "path": "/tmp/taskmaster.db" },
                "sync": { "auto_sync_interval_secs": 60, "detect_conflicts": false }
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.remote_base_url().as_deref(),
            Some("https://api.example.com")
        );
        assert_eq!(config.local.backend, LocalBackend::Sqlite);
        assert_eq!(config.auto_sync_interval(), Duration::from_secs(60));
        assert!(!config.sync.detect_conflicts);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(CoreConfig::from_json(r#"{ "remote": { "url": "x" } }"#).is_err());
        assert!(CoreConfig::from_json(r#"{ "extra": true }"#).is_err());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = CoreConfig::default();
        config.remote.base_url = Some("api.example.com".to_string());
        assert!(config.validate().is_err());

        let mut config = CoreConfig::default();
        config.sync.auto_sync_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = CoreConfig::default();
        config.local.backend = LocalBackend::Sqlite;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn env_overrides_apply_and_ignore_blanks() {
        let env = HashMap::from([
            (ENV_API_URL, " https://override.example.com ".to_string()),
            (ENV_DB_PATH, "  ".to_string()),
        ]);
        let config =
            CoreConfig::default().with_overrides_from(|key| env.get(key).cloned());

        assert_eq!(
            config.remote.base_url.as_deref(),
            Some("https://override.example.com")
        );
        assert_eq!(config.local.backend, LocalBackend::Memory);

        let env = HashMap::from([(ENV_DB_PATH, "/data/cache.db".to_string())]);
        let config =
            CoreConfig::default().with_overrides_from(|key| env.get(key).cloned());
        assert_eq!(config.local.backend, LocalBackend::Sqlite);
        assert_eq!(config.local.path, Some(PathBuf::from("/data/cache.db")));
    }

    #[test]
    fn load_from_path_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            CoreConfig::load_from_path(&path),
            Err(Error::Config(_))
        ));

        std::fs::write(&path, r#"{ "sync": { "auto_sync_interval_secs": 30 } }"#).unwrap();
        let config = CoreConfig::load_from_path(&path).unwrap();
        assert_eq!(config.auto_sync_interval(), Duration::from_secs(30));
    }
}
