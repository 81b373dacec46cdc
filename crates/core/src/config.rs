//! Console configuration
//!
//! Loaded from a TOML file, by default `config.toml` in the platform config
//! directory. Every section is optional.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub storage: StorageConfig,
    pub credentials: CredentialsConfig,
    pub seed: SeedConfig,
}

/// Where accounts and the current session are kept
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Database file (sqlite) or directory (file); platform data dir when unset
    pub path: Option<PathBuf>,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    File,
    Memory,
}

/// Bounded retry for transient store writes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 25,
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CredentialsConfig {
    pub scheme: CredentialScheme,
}

/// How stored credentials are produced and checked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialScheme {
    #[default]
    Argon2,
    Plain,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeedConfig {
    /// Populate a fresh store with the demo accounts
    pub demo_accounts: bool,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            demo_accounts: true,
        }
    }
}

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
    #[error("Could not determine data directory")]
    NoDataDir,
}

impl Config {
    /// Load from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load from the default location, falling back to defaults if the file is absent
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    /// Parse TOML content
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "storage.retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.storage.backend == StorageBackend::Memory && self.storage.path.is_some() {
            return Err(ConfigError::Invalid(
                "storage.path has no meaning for the memory backend".into(),
            ));
        }
        Ok(())
    }

    /// Default config file path
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Resolved storage location for file-backed backends
    pub fn storage_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.storage.path {
            return Ok(path.clone());
        }

        let data_dir = project_dirs()?.data_dir().to_path_buf();
        Ok(match self.storage.backend {
            StorageBackend::File => data_dir.join("store"),
            _ => data_dir.join("offchat.db"),
        })
    }
}

fn project_dirs() -> Result<ProjectDirs, ConfigError> {
    ProjectDirs::from("dev", "offchat", "offchat").ok_or(ConfigError::NoDataDir)
}
