//! Configuration loading
//!
//! Bootstrap configuration for the kiosk services, read once at startup from
//! a TOML file.
//!
//! # Config File Resolution
//!
//! 1. Explicit path (command-line `--config`)
//! 2. `SPKIOSK_CONFIG` environment variable
//! 3. `~/.config/spkiosk/config.toml` (platform config dir)
//! 4. `/etc/spkiosk/config.toml` (Linux only)
//!
//! When no file is found in the default locations, a warning is logged and
//! the compiled defaults are used. A path named explicitly (`--config` or
//! `SPKIOSK_CONFIG`) must exist, and a file that exists but fails to parse
//! is an error, so typos are not silently ignored.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SPKIOSK_CONFIG";

/// Default go-librespot API address
pub const DEFAULT_DAEMON_URL: &str = "http://127.0.0.1:3678";

/// Default HTTP listen address for the sync service
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5750";

/// Bootstrap configuration loaded from TOML
///
/// Every field has a compiled default, so an empty file is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Base URL of the daemon's HTTP command API
    #[serde(default = "default_daemon_url")]
    pub daemon_url: String,

    /// Event stream URL; derived from `daemon_url` when absent
    #[serde(default)]
    pub events_url: Option<String>,

    /// HTTP listen address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default)]
    pub sync: SyncSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[sync]` section: timing of the state synchronization service
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncSection {
    /// Long-poll timeout used when the caller does not supply one
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,

    /// First reconnect delay
    #[serde(default = "default_reconnect_initial_ms")]
    pub reconnect_initial_ms: u64,

    /// Reconnect delay ceiling
    #[serde(default = "default_reconnect_max_ms")]
    pub reconnect_max_ms: u64,

    /// Keepalive watchdog period
    #[serde(default = "default_watchdog_interval_ms")]
    pub watchdog_interval_ms: u64,

    /// WebSocket handshake timeout
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_daemon_url() -> String {
    DEFAULT_DAEMON_URL.to_string()
}

fn default_bind_addr() -> String {
    DEFAULT_BIND_ADDR.to_string()
}

fn default_poll_timeout_ms() -> u64 {
    30_000
}

fn default_reconnect_initial_ms() -> u64 {
    1_000
}

fn default_reconnect_max_ms() -> u64 {
    30_000
}

fn default_watchdog_interval_ms() -> u64 {
    30_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            daemon_url: default_daemon_url(),
            events_url: None,
            bind_addr: default_bind_addr(),
            sync: SyncSection::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            poll_timeout_ms: default_poll_timeout_ms(),
            reconnect_initial_ms: default_reconnect_initial_ms(),
            reconnect_max_ms: default_reconnect_max_ms(),
            watchdog_interval_ms: default_watchdog_interval_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl TomlConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Event stream URL, explicit or derived from `daemon_url`
    ///
    /// `http://host:port/...` becomes `ws://host:port/events`, `https` becomes `wss`.
    pub fn resolved_events_url(&self) -> Result<String> {
        if let Some(url) = &self.events_url {
            return Ok(url.clone());
        }
        derive_events_url(&self.daemon_url)
    }
}

/// Derive the daemon's event-stream URL from its HTTP API base URL
pub fn derive_events_url(daemon_url: &str) -> Result<String> {
    let (scheme, rest) = daemon_url
        .split_once("://")
        .ok_or_else(|| Error::Config(format!("daemon URL has no scheme: {}", daemon_url)))?;

    let ws_scheme = match scheme {
        "http" => "ws",
        "https" => "wss",
        other => {
            return Err(Error::Config(format!(
                "unsupported daemon URL scheme '{}' (expected http or https)",
                other
            )))
        }
    };

    let authority = rest.split('/').next().unwrap_or_default();
    if authority.is_empty() {
        return Err(Error::Config(format!("daemon URL has no host: {}", daemon_url)));
    }

    Ok(format!("{}://{}/events", ws_scheme, authority))
}

/// Locates and loads the bootstrap config file
pub struct ConfigResolver {
    explicit_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(explicit_path: Option<PathBuf>) -> Self {
        Self { explicit_path }
    }

    /// Find the config file to use, if any exists
    pub fn locate(&self) -> Option<PathBuf> {
        // Priority 1: explicit path (reported even if missing so load() can fail loudly)
        if let Some(path) = &self.explicit_path {
            return Some(path.clone());
        }

        // Priority 2: environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: user config dir
        if let Some(path) = dirs::config_dir().map(|d| d.join("spkiosk").join("config.toml")) {
            if path.exists() {
                return Some(path);
            }
        }

        // Priority 4: system-wide config
        if cfg!(target_os = "linux") {
            let system = PathBuf::from("/etc/spkiosk/config.toml");
            if system.exists() {
                return Some(system);
            }
        }

        None
    }

    /// Load the config file, falling back to defaults when none exists
    ///
    /// An explicitly requested file (CLI or env var) must exist.
    pub fn load(&self) -> Result<TomlConfig> {
        match self.locate() {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                info!("Loading config from {}", path.display());
                TomlConfig::from_file(&path)
            }
            None => {
                warn!("No config file found, using compiled defaults");
                Ok(TomlConfig::default())
            }
        }
    }
}
