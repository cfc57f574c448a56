//! Configuration for `tasksync-server`.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/tasksync-server/config.toml`)
//! 4. Compiled defaults

use std::path::{Path, PathBuf};

use crate::server::{DEFAULT_MAX_PAYLOAD_SIZE, ServerState};

/// Errors that can occur when loading server configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerConfigFile {
    server: ServerFileConfig,
}

/// `[server]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    bind_addr: Option<String>,
    max_payload_size: Option<usize>,
}

/// CLI arguments for the server.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "REST endpoint serving a tasksync task collection")]
pub struct ServerCliArgs {
    /// Address to bind to.
    #[arg(short, long, env = "TASKSYNC_SERVER_ADDR")]
    pub bind: Option<String>,

    /// Path to config file (default: `~/.config/tasksync-server/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Maximum request body size in bytes. Zero means the default.
    #[arg(long, env = "TASKSYNC_SERVER_MAX_PAYLOAD")]
    pub max_payload_size: Option<usize>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TASKSYNC_SERVER_LOG")]
    pub log_level: String,
}

/// Default bind address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:9000";

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_addr: String,
    /// Maximum accepted `PUT` body size in bytes, always non-zero.
    pub max_payload_size: usize,
    /// Log level filter string.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed.
    /// A missing default config file is not an error.
    pub fn load(cli: &ServerCliArgs) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => read_config_file(path)?,
            None => default_config_path()
                .map(|path| read_optional_config_file(&path))
                .transpose()?
                .flatten()
                .unwrap_or_default(),
        };
        Ok(Self::merge(cli, file))
    }

    /// Builds the shared state the router serves from.
    #[must_use]
    pub fn state(&self) -> ServerState {
        ServerState::with_config(self.max_payload_size)
    }

    fn merge(cli: &ServerCliArgs, file: ServerConfigFile) -> Self {
        let ServerFileConfig {
            bind_addr,
            max_payload_size,
        } = file.server;

        Self {
            bind_addr: cli
                .bind
                .clone()
                .or(bind_addr)
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            max_payload_size: cli
                .max_payload_size
                .or(max_payload_size)
                .filter(|&n| n > 0)
                .unwrap_or(DEFAULT_MAX_PAYLOAD_SIZE),
            log_level: cli.log_level.clone(),
        }
    }
}

/// `~/.config/tasksync-server/config.toml`, if the platform has a config dir.
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tasksync-server").join("config.toml"))
}

fn read_config_file(path: &Path) -> Result<ServerConfigFile, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&contents)?)
}

/// Like [`read_config_file`], but a missing file is `Ok(None)`.
fn read_optional_config_file(path: &Path) -> Result<Option<ServerConfigFile>, ConfigError> {
    if !path.try_exists().unwrap_or(false) {
        return Ok(None);
    }
    read_config_file(path).map(Some)
}
