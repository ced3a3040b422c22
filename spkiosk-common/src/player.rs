//! Player state model
//!
//! The playback snapshot republished to observers, as reported by the
//! Spotify-Connect daemon. Field names serialize in camelCase because the
//! kiosk UI reads them directly.

use serde::{Deserialize, Serialize};

/// Process-lifetime state version counter value
pub type StateVersion = u64;

/// Default volume range reported by the daemon before any `volume` event
pub const DEFAULT_VOLUME_MAX: u32 = 65535;

/// Metadata for the track currently loaded on the daemon
///
/// Replaced wholesale on every `metadata` event, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackMetadata {
    pub uri: String,
    pub name: String,
    pub artist_names: Vec<String>,
    pub album_name: String,
    pub album_cover_url: Option<String>,
    /// Track length in milliseconds
    pub duration: u64,
}

/// Most recently known playback state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub is_paused: bool,
    /// Daemon currently reports an active Connect session
    pub is_active: bool,
    pub current_track: Option<TrackMetadata>,
    /// Playback position in milliseconds
    pub position: u64,
    /// Duration in milliseconds
    pub duration: u64,
    pub volume: u32,
    pub volume_max: u32,
    pub repeat_context: bool,
    pub repeat_track: bool,
    pub shuffle_context: bool,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            is_paused: true,
            is_active: false,
            current_track: None,
            position: 0,
            duration: 0,
            volume: 0,
            volume_max: DEFAULT_VOLUME_MAX,
            repeat_context: false,
            repeat_track: false,
            shuffle_context: false,
        }
    }
}

/// Immutable versioned view of the player state
///
/// Shared as `Arc<Snapshot>`; a new one is built for every accepted change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: PlayerState,
    pub version: StateVersion,
}

/// Upstream event-stream connection status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_paused_and_inactive() {
        let state = PlayerState::default();
        assert!(state.is_paused);
        assert!(!state.is_active);
        assert!(state.current_track.is_none());
        assert_eq!(state.position, 0);
        assert_eq!(state.volume_max, DEFAULT_VOLUME_MAX);
    }

    #[test]
    fn test_state_serializes_camel_case() {
        let json = serde_json::to_value(PlayerState::default()).unwrap();
        assert_eq!(json["isPaused"], true);
        assert_eq!(json["isActive"], false);
        assert!(json["currentTrack"].is_null());
        assert_eq!(json["volumeMax"], 65535);
        assert_eq!(json["shuffleContext"], false);
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Disconnected.is_connected());
    }
}
