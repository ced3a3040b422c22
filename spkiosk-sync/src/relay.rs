//! Command relay
//!
//! Forwards player commands to the daemon's HTTP API. Commands are not
//! versioned and do not touch the state store: their effect comes back
//! through the event stream like any other change.

use reqwest::{Client, Url};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Per-request timeout for daemon commands
const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for the daemon's `/player/*` command endpoints
#[derive(Clone)]
pub struct CommandRelay {
    client: Client,
    base_url: Url,
}

impl CommandRelay {
    pub fn new(base_url: Url) -> Result<Self> {
        let client = Client::builder().timeout(COMMAND_TIMEOUT).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, mut base_url: Url) -> Self {
        // Url::join replaces the last path segment unless the base ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn post(&self, command: &str, body: Option<Value>) -> Result<()> {
        let url = self
            .base_url
            .join(command)
            .map_err(|e| Error::Config(format!("invalid command path '{}': {}", command, e)))?;

        debug!(%url, "Relaying command to daemon");
        let mut request = self.client.post(url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        warn!(command, status = status.as_u16(), "Daemon rejected command");
        Err(Error::Relay {
            command: command.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    /// Start playing a context (track, album, playlist URI)
    pub async fn play(&self, uri: &str, skip_to_uri: Option<&str>, paused: bool) -> Result<()> {
        let mut body = json!({ "uri": uri, "paused": paused });
        if let Some(skip_to) = skip_to_uri {
            body["skip_to_uri"] = json!(skip_to);
        }
        self.post("player/play", Some(body)).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.post("player/resume", None).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.post("player/pause", None).await
    }

    pub async fn play_pause(&self) -> Result<()> {
        self.post("player/playpause", None).await
    }

    pub async fn next(&self) -> Result<()> {
        self.post("player/next", None).await
    }

    pub async fn previous(&self) -> Result<()> {
        self.post("player/prev", None).await
    }

    /// Seek to `position` ms, or by `position` ms when `relative`
    pub async fn seek(&self, position: i64, relative: bool) -> Result<()> {
        self.post(
            "player/seek",
            Some(json!({ "position": position, "relative": relative })),
        )
        .await
    }

    /// Set volume (daemon's own scale, see `PlayerState::volume_max`)
    pub async fn set_volume(&self, volume: i64, relative: bool) -> Result<()> {
        self.post(
            "player/volume",
            Some(json!({ "volume": volume, "relative": relative })),
        )
        .await
    }

    pub async fn set_repeat_context(&self, value: bool) -> Result<()> {
        self.post("player/repeat_context", Some(json!({ "repeat_context": value })))
            .await
    }

    pub async fn set_repeat_track(&self, value: bool) -> Result<()> {
        self.post("player/repeat_track", Some(json!({ "repeat_track": value })))
            .await
    }

    pub async fn set_shuffle_context(&self, value: bool) -> Result<()> {
        self.post("player/shuffle_context", Some(json!({ "shuffle_context": value })))
            .await
    }

    pub async fn add_to_queue(&self, uri: &str) -> Result<()> {
        self.post("player/add_to_queue", Some(json!({ "uri": uri })))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let relay = CommandRelay::new(Url::parse("http://127.0.0.1:3678/api").unwrap()).unwrap();
        assert_eq!(relay.base_url().as_str(), "http://127.0.0.1:3678/api/");
        assert_eq!(
            relay.base_url().join("player/next").unwrap().as_str(),
            "http://127.0.0.1:3678/api/player/next"
        );
    }

    #[test]
    fn test_root_base_url_unchanged() {
        let relay = CommandRelay::new(Url::parse("http://127.0.0.1:3678").unwrap()).unwrap();
        assert_eq!(relay.base_url().as_str(), "http://127.0.0.1:3678/");
    }
}
