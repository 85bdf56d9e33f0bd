//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `smarthome.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage backend selection.
    pub storage: StorageConfig,
    /// Database settings, used by the `SQLite` backend.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Capability file location.
    pub capabilities: CapabilitiesConfig,
    /// Startup data.
    pub bootstrap: BootstrapConfig,
}

/// Where aggregates are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process memory, lost on exit.
    #[default]
    Memory,
    /// `SQLite` through sqlx.
    Sqlite,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(ConfigError::Validation(format!(
                "unknown storage backend `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CapabilitiesConfig {
    /// Path of the TOML capability file.
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Load the demo house on startup.
    pub demo_data: bool,
}

impl Config {
    /// Load configuration from `smarthome.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("smarthome.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = lookup("SMARTHOME_STORAGE") {
            self.storage.backend = val.parse()?;
        }
        if let Some(val) = lookup("SMARTHOME_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = lookup("SMARTHOME_CAPABILITIES") {
            self.capabilities.path = PathBuf::from(val);
        }
        if let Some(val) = lookup("SMARTHOME_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = lookup("RUST_LOG") {
            self.logging.filter = val;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.backend == StorageBackend::Sqlite && self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "database url is required by the sqlite backend".to_string(),
            ));
        }
        if self.capabilities.path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "capability file path must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:smarthome.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "smarthomed=info,smarthome=info".to_string(),
        }
    }
}

impl Default for CapabilitiesConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("capabilities.toml"),
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self { demo_data: true }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.database.url, "sqlite:smarthome.db?mode=rwc");
        assert_eq!(config.capabilities.path, PathBuf::from("capabilities.toml"));
        assert!(config.bootstrap.demo_data);
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [storage]
            backend = 'sqlite'

            [database]
            url = 'sqlite:test.db'

            [logging]
            filter = 'debug'

            [capabilities]
            path = 'conf/capabilities.toml'

            [bootstrap]
            demo_data = false
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.database_url(), "sqlite:test.db");
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(
            config.capabilities.path,
            PathBuf::from("conf/capabilities.toml")
        );
        assert!(!config.bootstrap.demo_data);
    }

    #[test]
    fn should_reject_unknown_backend_in_file() {
        let result: Result<Config, _> = toml::from_str("[storage]\nbackend = 'postgres'");
        assert!(result.is_err());
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn should_let_environment_override_file_values() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[
                ("SMARTHOME_STORAGE", "SQLite"),
                ("SMARTHOME_DATABASE_URL", "sqlite::memory:"),
                ("SMARTHOME_CAPABILITIES", "/etc/smarthome/capabilities.toml"),
                ("SMARTHOME_LOG", "warn"),
            ]))
            .unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.database_url(), "sqlite::memory:");
        assert_eq!(
            config.capabilities.path,
            PathBuf::from("/etc/smarthome/capabilities.toml")
        );
        assert_eq!(config.logging.filter, "warn");
    }

    #[test]
    fn should_prefer_rust_log_over_smarthome_log() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[("SMARTHOME_LOG", "warn"), ("RUST_LOG", "trace")]))
            .unwrap();
        assert_eq!(config.logging.filter, "trace");
    }

    #[test]
    fn should_reject_unknown_backend_in_environment() {
        let mut config = Config::default();
        let result = config.apply_overrides(env(&[("SMARTHOME_STORAGE", "postgres")]));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_reject_sqlite_backend_without_url() {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Sqlite;
        config.database.url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_accept_memory_backend_without_url() {
        let mut config = Config::default();
        config.database.url = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }
}
