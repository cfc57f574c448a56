//! Configuration system for the `tasksync` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/tasksync/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tasksync_proto::task::{Priority, TaskId};

use crate::service::DEFAULT_EVENT_BUFFER;

/// Errors that can occur when loading configuration.
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

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    remote: RemoteFileConfig,
    store: StoreFileConfig,
    service: ServiceFileConfig,
}

/// `[remote]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct RemoteFileConfig {
    base_url: Option<String>,
    request_timeout_secs: Option<u64>,
}

/// `[store]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StoreFileConfig {
    path: Option<PathBuf>,
}

/// `[service]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServiceFileConfig {
    event_buffer: Option<usize>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Default REST endpoint: a `tasksync-server` on the local machine.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:9000/";

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST endpoint holding the task collection.
    pub base_url: String,
    /// Per-request timeout for the HTTP client.
    pub request_timeout: Duration,
    /// Path of the local JSON task store.
    pub store_path: PathBuf,
    /// Capacity of the sync service command and event channels.
    pub event_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            store_path: default_store_path(),
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an error.
    /// Otherwise the default path (`~/.config/tasksync/config.toml`) is tried
    /// and silently ignored if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            base_url: cli
                .base_url
                .clone()
                .or_else(|| file.remote.base_url.clone())
                .unwrap_or(defaults.base_url),
            request_timeout: cli
                .request_timeout_secs
                .or(file.remote.request_timeout_secs)
                .map_or(defaults.request_timeout, Duration::from_secs),
            store_path: cli
                .store
                .clone()
                .or_else(|| file.store.path.clone())
                .unwrap_or(defaults.store_path),
            event_buffer: file
                .service
                .event_buffer
                .filter(|&n| n > 0)
                .unwrap_or(defaults.event_buffer),
        }
    }
}

/// `<data_dir>/tasksync/tasks.json`, or `./tasks.json` when the platform
/// has no data directory.
fn default_store_path() -> PathBuf {
    dirs::data_dir().map_or_else(
        || PathBuf::from("tasks.json"),
        |dir| dir.join("tasksync").join("tasks.json"),
    )
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Keep a local task list in sync with a REST endpoint")]
pub struct CliArgs {
    /// Base URL of the REST endpoint.
    #[arg(long, env = "TASKSYNC_URL")]
    pub base_url: Option<String>,

    /// Path of the local task store.
    #[arg(long, env = "TASKSYNC_STORE")]
    pub store: Option<PathBuf>,

    /// Per-request timeout for the REST endpoint, in seconds.
    #[arg(long, env = "TASKSYNC_TIMEOUT")]
    pub request_timeout_secs: Option<u64>,

    /// Path to config file (default: `~/.config/tasksync/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn", env = "TASKSYNC_LOG")]
    pub log_level: String,

    /// Write logs to this file instead of stderr.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// What to do; defaults to `list`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands of the `tasksync` binary.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show local tasks grouped by priority.
    List,
    /// Fetch the remote collection and merge it into the local store.
    Sync,
    /// Create a task and push it.
    Add {
        /// Task name.
        name: String,
        /// Free-form notes.
        #[arg(long)]
        notes: Option<String>,
        /// low, normal, high or critical.
        #[arg(long, short, default_value_t = Priority::Normal)]
        priority: Priority,
        /// Create the task already completed.
        #[arg(long)]
        complete: bool,
    },
    /// Flip a task between open and complete.
    Toggle {
        /// Task identifier.
        id: TaskId,
    },
    /// Change a task's name, notes or priority.
    Edit {
        /// Task identifier.
        id: TaskId,
        /// New name.
        #[arg(long)]
        name: Option<String>,
        /// New notes.
        #[arg(long, conflicts_with = "clear_notes")]
        notes: Option<String>,
        /// Remove the notes.
        #[arg(long)]
        clear_notes: bool,
        /// New priority.
        #[arg(long, short)]
        priority: Option<Priority>,
    },
    /// Delete a task remotely, then locally.
    Delete {
        /// Task identifier.
        id: TaskId,
    },
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    }

    let Some(config_dir) = dirs::config_dir() else {
        return Ok(ConfigFile::default());
    };
    let path = config_dir.join("tasksync").join("config.toml");

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
