//! Shared API request/response types

use serde::{Deserialize, Serialize};

use crate::player::{ConnectionState, PlayerState, StateVersion};

// ========================================
// State Observation
// ========================================

/// Query parameters for the long-poll endpoint
///
/// ```
/// // GET /api/state?version=12&timeout=25000
/// use spkiosk_common::api::PollQuery;
///
/// let query: PollQuery = serde_json::from_str(r#"{"version": 12, "timeout": 25000}"#).unwrap();
/// assert_eq!(query.version, 12);
/// assert_eq!(query.timeout, Some(25000));
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PollQuery {
    /// Last version the caller has seen (0 when it has seen nothing)
    #[serde(default)]
    pub version: StateVersion,

    /// Maximum wait in milliseconds; server default when absent
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// Long-poll result: snapshot, its version, and upstream connectivity
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PollResponse {
    pub state: PlayerState,
    pub version: StateVersion,
    pub connected: bool,
}

/// Connection status (cheap, never waits)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub connected: bool,
    pub connection_state: ConnectionState,
    pub version: StateVersion,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

// ========================================
// Player Commands
// ========================================

/// POST /api/player/play
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayRequest {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_to_uri: Option<String>,
    #[serde(default)]
    pub paused: bool,
}

/// POST /api/player/seek (position in milliseconds)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SeekRequest {
    pub position: i64,
    #[serde(default)]
    pub relative: bool,
}

/// POST /api/player/volume
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VolumeRequest {
    pub volume: i64,
    #[serde(default)]
    pub relative: bool,
}

/// POST /api/player/{repeat_context,repeat_track,shuffle_context}
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlagRequest {
    pub value: bool,
}

/// POST /api/player/add_to_queue
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueRequest {
    pub uri: String,
}
