//! Configuration for the stint binary.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = "stint.sqlite";
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_UI_TICK_MS: u64 = 200;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize config at {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: toml::ser::Error,
    },
    #[error("failed to create config parent directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write config file at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level application configuration. Every section is optional in the
/// file; missing sections take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub autosave: AutosaveConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutosaveConfig {
    /// Seconds between background flushes of a live session.
    pub interval_secs: u64,
}

impl AutosaveConfig {
    /// Flush cadence; a zero setting falls back to the default after
    /// validation has reported it.
    pub fn interval(&self) -> Duration {
        let secs = if self.interval_secs == 0 {
            DEFAULT_AUTOSAVE_INTERVAL_SECS
        } else {
            self.interval_secs
        };
        Duration::from_secs(secs)
    }
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_AUTOSAVE_INTERVAL_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiConfig {
    /// Milliseconds between input polls on the live-session screen.
    pub tick_ms: u64,
}

impl UiConfig {
    pub fn tick(&self) -> Duration {
        let millis = if self.tick_ms == 0 {
            DEFAULT_UI_TICK_MS
        } else {
            self.tick_ms
        };
        Duration::from_millis(millis)
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_UI_TICK_MS,
        }
    }
}

pub fn parse_app_config(contents: &str) -> Result<AppConfig, toml::de::Error> {
    toml::from_str(contents)
}

pub fn load_app_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let path_ref = path.as_ref();
    let body = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
        path: path_ref.to_path_buf(),
        source,
    })?;
    parse_app_config(&body).map_err(|source| ConfigError::Parse {
        path: path_ref.to_path_buf(),
        source,
    })
}

/// Loads the config file, treating a missing file as the default config.
pub fn load_or_default_app_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    match load_app_config(path) {
        Ok(config) => Ok(config),
        Err(ConfigError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            Ok(AppConfig::default())
        }
        Err(err) => Err(err),
    }
}

pub fn save_app_config(path: impl AsRef<Path>, config: &AppConfig) -> Result<(), ConfigError> {
    let path_ref = path.as_ref();
    let parent = path_ref.parent().map(Path::to_path_buf);
    if let Some(parent_dir) = parent.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(&parent_dir).map_err(|source| ConfigError::CreateDir {
            path: parent_dir,
            source,
        })?;
    }

    let body = toml::to_string_pretty(config).map_err(|source| ConfigError::Serialize {
        path: path_ref.to_path_buf(),
        source,
    })?;
    fs::write(path_ref, body).map_err(|source| ConfigError::Write {
        path: path_ref.to_path_buf(),
        source,
    })?;
    Ok(())
}
