//! TOML configuration with environment overrides.

use crate::error::ConfigError;
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn mindstore_dir() -> PathBuf {
    let home = UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());
    home.join(".mindstore")
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub cooldowns: CooldownConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend name: "sqlite" or "memory".
    #[serde(default = "default_storage_backend")]
    pub backend: String,
    /// SQLite database path; `~` is expanded.
    #[serde(default = "default_storage_path")]
    pub path: String,
}

fn default_storage_backend() -> String {
    "sqlite".into()
}

fn default_storage_path() -> String {
    mindstore_dir().join("records.db").to_string_lossy().into_owned()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            path: default_storage_path(),
        }
    }
}

impl StorageConfig {
    #[must_use]
    pub fn expanded_path(&self) -> String {
        shellexpand::tilde(&self.path).into_owned()
    }
}

/// Default vision-gate cooldowns per capture reason, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CooldownConfig {
    #[serde(default = "default_chat_cooldown_ms")]
    pub chat_ms: i64,
    #[serde(default = "default_tactical_cooldown_ms")]
    pub tactical_ms: i64,
    #[serde(default = "default_auto_cooldown_ms")]
    pub auto_ms: i64,
}

fn default_chat_cooldown_ms() -> i64 {
    1_500
}

fn default_tactical_cooldown_ms() -> i64 {
    8_000
}

fn default_auto_cooldown_ms() -> i64 {
    60_000
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            chat_ms: default_chat_cooldown_ms(),
            tactical_ms: default_tactical_cooldown_ms(),
            auto_ms: default_auto_cooldown_ms(),
        }
    }
}

impl CooldownConfig {
    #[must_use]
    pub fn for_reason(&self, reason: crate::record::CounterBucket) -> i64 {
        use crate::record::CounterBucket;
        match reason {
            CounterBucket::Chat => self.chat_ms,
            CounterBucket::Tactical => self.tactical_ms,
            CounterBucket::Auto => self.auto_ms,
        }
    }
}

impl Config {
    #[must_use]
    pub fn default_path() -> PathBuf {
        mindstore_dir().join("config.toml")
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let mut config: Self =
            toml::from_str(&raw).map_err(|err| ConfigError::Load(err.to_string()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from `path` (or the default location), falling back to defaults
    /// on a missing or unreadable file. Never fails.
    #[must_use]
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = path.map_or_else(Self::default_path, Path::to_path_buf);
        let mut config = match fs::read_to_string(&path) {
            Ok(raw) => match toml::from_str(&raw) {
                Ok(parsed) => parsed,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "invalid config file, using defaults");
                    Self::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "unreadable config file, using defaults");
                Self::default()
            }
        };
        config.apply_env_overrides();
        config
    }

    pub fn apply_env_overrides(&mut self) {
        self.override_storage(
            std::env::var("MINDSTORE_STORAGE_BACKEND").ok(),
            std::env::var("MINDSTORE_STORAGE_PATH").ok(),
        );
    }

    fn override_storage(&mut self, backend: Option<String>, path: Option<String>) {
        if let Some(backend) = backend {
            if !backend.is_empty() {
                self.storage.backend = backend;
            }
        }
        if let Some(path) = path {
            if !path.is_empty() {
                self.storage.path = path;
            }
        }
    }
}
