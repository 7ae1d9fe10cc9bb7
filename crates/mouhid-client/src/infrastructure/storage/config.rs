//! TOML-based configuration persistence for the client.
//!
//! Reads and writes `ClientConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\MouHidMonitor\mouhid.toml`
//! - Linux:    `~/.config/mouhid-monitor/mouhid.toml`
//! - macOS:    `~/Library/Application Support/MouHidMonitor/mouhid.toml`
//!
//! ```toml
//! [client]
//! poll_interval_ms = 5000
//! log_level = "info"
//! device_path = '\\.\MouHidInputHook'
//!
//! [monitor]
//! trap_on_stale_notification = false
//!
//! [simulation]
//! enabled = true
//! batch_interval_ms = 100
//! max_batch_size = 4
//! hotplug_interval_ms = 12000
//! ```
//!
//! Every field has a serde default, so a missing file, a missing section, or
//! a missing key all fall back to the values above.

use std::path::{Path, PathBuf};
use std::time::Duration;

use mouhid_core::protocol::LOCAL_DEVICE_PATH;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name of the config inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "mouhid.toml";

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level client configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    #[serde(default)]
    pub client: PollConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Polling client settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollConfig {
    /// Interval between state queries, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Path of the control device.
    #[serde(default = "default_device_path")]
    pub device_path: String,
}

/// Engine settings, used when the engine is hosted in-process.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MonitorConfig {
    /// Panic on a device notification for a superseded registration.
    #[serde(default)]
    pub trap_on_stale_notification: bool,
}

/// Synthetic mouse hardware used by the in-process engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationConfig {
    /// Host the engine in-process instead of opening the Windows device.
    #[serde(default = "default_simulation_enabled")]
    pub enabled: bool,
    /// Interval between packet batches, in milliseconds.
    #[serde(default = "default_batch_interval_ms")]
    pub batch_interval_ms: u64,
    /// Largest batch the synthetic class driver delivers.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Interval between synthetic hot-plug events, in milliseconds. `0` disables them.
    #[serde(default = "default_hotplug_interval_ms")]
    pub hotplug_interval_ms: u64,
}

impl PollConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_poll_interval_ms() -> u64 {
    5000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_device_path() -> String {
    LOCAL_DEVICE_PATH.to_string()
}
fn default_simulation_enabled() -> bool {
    !cfg!(target_os = "windows")
}
fn default_batch_interval_ms() -> u64 {
    100
}
fn default_max_batch_size() -> usize {
    4
}
fn default_hotplug_interval_ms() -> u64 {
    12_000
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            log_level: default_log_level(),
            device_path: default_device_path(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: default_simulation_enabled(),
            batch_interval_ms: default_batch_interval_ms(),
            max_batch_size: default_max_batch_size(),
            hotplug_interval_ms: default_hotplug_interval_ms(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the full path to the config file in the platform config directory.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    let dir = platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Loads the config from `path`, or from the platform path when `None`.
///
/// Returns `ClientConfig::default()` if the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => config_file_path()?,
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ClientConfig::default()),
        Err(e) => Err(ConfigError::Io { path, source: e }),
    }
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &ClientConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("MouHidMonitor"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("mouhid-monitor"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("MouHidMonitor")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
