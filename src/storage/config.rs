//! Configuration handling for taskboard
//!
//! Settings are resolved in layers, later layers winning:
//!
//! 1. Built-in defaults
//! 2. A TOML file: `--config <FILE>`, else `./taskboard.toml`, else
//!    `~/.config/taskboard/config.toml` (platform equivalent)
//! 3. Environment: `HOST`, `PORT`, `CORS_ORIGIN`, `DATA_PATH`,
//!    `TASKBOARD_STORAGE`
//! 4. Command-line flags (applied by the CLI)

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the project-local config file
pub const CONFIG_FILE_NAME: &str = "taskboard.toml";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    Invalid(String, String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Which [`crate::storage::TaskStore`] implementation to use
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Jsonl,
    Sqlite,
    Memory,
}

impl StorageBackend {
    /// Default data file, relative to the working directory
    pub fn default_data_path(&self) -> PathBuf {
        let file = match self {
            StorageBackend::Sqlite => "tasks.db",
            StorageBackend::Jsonl | StorageBackend::Memory => "tasks.jsonl",
        };
        PathBuf::from("data").join(file)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Jsonl => "jsonl",
            StorageBackend::Sqlite => "sqlite",
            StorageBackend::Memory => "memory",
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jsonl" | "file" => Ok(StorageBackend::Jsonl),
            "sqlite" => Ok(StorageBackend::Sqlite),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!(
                "unknown storage backend '{}' (expected jsonl, sqlite or memory)",
                other
            )),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed CORS origin; `*` allows any origin
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            cors_origin: "http://localhost:3000".to_string(),
        }
    }
}

impl ServerConfig {
    /// Returns `host:port`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Storage settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage backend
    pub backend: StorageBackend,

    /// Path of the JSONL file or SQLite database (ignored for `memory`).
    /// Unset means the backend's default file under `data/`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_path: Option<PathBuf>,
}

impl StorageConfig {
    /// The configured data file, or the backend's default
    pub fn resolved_path(&self) -> PathBuf {
        self.data_path
            .clone()
            .unwrap_or_else(|| self.backend.default_data_path())
    }
}

/// Combined configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

impl Config {
    /// Loads configuration from a file and the environment
    ///
    /// An explicit path must exist; otherwise the default locations are
    /// tried and defaults are used if none is present.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::find_config_file() {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };

        config.apply_env()?;
        Ok(config)
    }

    /// Parses a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        let config = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "taskboard", "taskboard")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Finds the first existing config file in the default locations
    pub fn find_config_file() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.is_file() {
            return Some(local);
        }

        let global = Self::global_config_dir()?.join("config.toml");
        global.is_file().then_some(global)
    }

    /// Applies overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable source
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }

        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|e| ConfigError::Invalid("PORT".to_string(), format!("{}", e)))?;
        }

        if let Some(origin) = lookup("CORS_ORIGIN") {
            self.server.cors_origin = origin;
        }

        if let Some(path) = lookup("DATA_PATH") {
            self.storage.data_path = Some(PathBuf::from(path));
        }

        if let Some(backend) = lookup("TASKBOARD_STORAGE") {
            self.storage.backend = backend
                .parse()
                .map_err(|e| ConfigError::Invalid("TASKBOARD_STORAGE".to_string(), e))?;
        }

        Ok(())
    }

    /// Renders the configuration as a commented TOML document
    pub fn to_toml(&self) -> Result<String> {
        let body = toml::to_string_pretty(self).context("Failed to serialize config")?;
        Ok(format!(
            "# taskboard configuration\n\
             # Environment variables HOST, PORT, CORS_ORIGIN, DATA_PATH and\n\
             # TASKBOARD_STORAGE override these values.\n\n{}",
            body
        ))
    }

    /// Writes the configuration to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory: {}", parent.display())
                })?;
            }
        }

        fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write config: {}", path.display()))
    }
}
