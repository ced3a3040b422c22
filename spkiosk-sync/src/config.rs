//! spkiosk-sync specific configuration
//!
//! `SyncConfig` is everything the sync core needs; `ServiceConfig` adds the
//! HTTP surface. Both are built from a `TomlConfig` plus command-line
//! overrides and validated before anything starts.

use crate::error::{Error, Result};
use reqwest::Url;
use spkiosk_common::config::TomlConfig;
use std::net::SocketAddr;
use std::time::Duration;

/// State synchronization service configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Daemon event stream, `ws://<host>/events`
    pub events_url: String,
    /// Long-poll timeout when the caller does not supply one
    pub poll_timeout: Duration,
    /// First reconnect delay
    pub reconnect_initial: Duration,
    /// Reconnect delay ceiling
    pub reconnect_max: Duration,
    /// Keepalive watchdog period
    pub watchdog_interval: Duration,
    /// WebSocket handshake timeout
    pub connect_timeout: Duration,
}

impl SyncConfig {
    /// Config for `events_url` with default timing
    pub fn new(events_url: impl Into<String>) -> Self {
        Self {
            events_url: events_url.into(),
            poll_timeout: Duration::from_secs(30),
            reconnect_initial: Duration::from_secs(1),
            reconnect_max: Duration::from_secs(30),
            watchdog_interval: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub fn from_toml(toml: &TomlConfig) -> Result<Self> {
        let sync = &toml.sync;
        let config = Self {
            events_url: toml.resolved_events_url()?,
            poll_timeout: Duration::from_millis(sync.poll_timeout_ms),
            reconnect_initial: Duration::from_millis(sync.reconnect_initial_ms),
            reconnect_max: Duration::from_millis(sync.reconnect_max_ms),
            watchdog_interval: Duration::from_millis(sync.watchdog_interval_ms),
            connect_timeout: Duration::from_millis(sync.connect_timeout_ms),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.events_url)
            .map_err(|e| Error::Config(format!("invalid events URL '{}': {}", self.events_url, e)))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::Config(format!(
                "events URL must use ws:// or wss://, got '{}'",
                self.events_url
            )));
        }
        if url.host_str().is_none() {
            return Err(Error::Config(format!("events URL has no host: {}", self.events_url)));
        }

        for (name, value) in [
            ("poll_timeout", self.poll_timeout),
            ("reconnect_initial", self.reconnect_initial),
            ("reconnect_max", self.reconnect_max),
            ("watchdog_interval", self.watchdog_interval),
            ("connect_timeout", self.connect_timeout),
        ] {
            if value.is_zero() {
                return Err(Error::Config(format!("{} must be greater than zero", name)));
            }
        }

        if self.reconnect_initial > self.reconnect_max {
            return Err(Error::Config(format!(
                "reconnect_initial ({:?}) exceeds reconnect_max ({:?})",
                self.reconnect_initial, self.reconnect_max
            )));
        }

        Ok(())
    }
}

/// Full service configuration (sync core + HTTP surface)
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Daemon command API base URL
    pub daemon_url: Url,
    pub bind_addr: SocketAddr,
    pub sync: SyncConfig,
}

/// Command-line values that take precedence over the TOML file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub daemon_url: Option<String>,
    pub events_url: Option<String>,
    pub bind_addr: Option<String>,
}

impl ServiceConfig {
    /// Merge overrides onto the TOML config and validate the result
    ///
    /// Overriding `daemon_url` alone also moves the derived events URL.
    pub fn resolve(mut toml: TomlConfig, overrides: Overrides) -> Result<Self> {
        if let Some(url) = overrides.daemon_url {
            toml.daemon_url = url;
        }
        if let Some(url) = overrides.events_url {
            toml.events_url = Some(url);
        }
        if let Some(addr) = overrides.bind_addr {
            toml.bind_addr = addr;
        }

        let daemon_url = Url::parse(&toml.daemon_url)
            .map_err(|e| Error::Config(format!("invalid daemon URL '{}': {}", toml.daemon_url, e)))?;
        if !matches!(daemon_url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "daemon URL must use http:// or https://, got '{}'",
                toml.daemon_url
            )));
        }

        let bind_addr = toml
            .bind_addr
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("invalid bind address '{}': {}", toml.bind_addr, e)))?;

        Ok(Self {
            daemon_url,
            bind_addr,
            sync: SyncConfig::from_toml(&toml)?,
        })
    }
}
