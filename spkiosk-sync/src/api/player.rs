//! Player command endpoints
//!
//! Each handler validates its input and relays one command to the daemon.
//! Success is `204 No Content`; the resulting state change arrives through
//! the event stream, not in the response.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use spkiosk_common::api::{FlagRequest, PlayRequest, QueueRequest, SeekRequest, VolumeRequest};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

fn require_spotify_uri(uri: &str) -> ApiResult<()> {
    if uri.starts_with("spotify:") {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("not a spotify URI: '{}'", uri)))
    }
}

/// POST /api/player/play
pub async fn play(
    State(state): State<AppState>,
    Json(req): Json<PlayRequest>,
) -> ApiResult<StatusCode> {
    require_spotify_uri(&req.uri)?;
    if let Some(skip_to) = &req.skip_to_uri {
        require_spotify_uri(skip_to)?;
    }
    info!(uri = %req.uri, "Play requested");
    state
        .relay
        .play(&req.uri, req.skip_to_uri.as_deref(), req.paused)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/player/resume
pub async fn resume(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.relay.resume().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/player/pause
pub async fn pause(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.relay.pause().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/player/playpause
pub async fn play_pause(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.relay.play_pause().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/player/next
pub async fn next(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.relay.next().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/player/prev
pub async fn previous(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.relay.previous().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/player/seek
pub async fn seek(
    State(state): State<AppState>,
    Json(req): Json<SeekRequest>,
) -> ApiResult<StatusCode> {
    if !req.relative && req.position < 0 {
        return Err(ApiError::BadRequest(format!(
            "absolute seek position must be >= 0, got {}",
            req.position
        )));
    }
    state.relay.seek(req.position, req.relative).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/player/volume
pub async fn volume(
    State(state): State<AppState>,
    Json(req): Json<VolumeRequest>,
) -> ApiResult<StatusCode> {
    if !req.relative {
        let max = i64::from(state.sync.snapshot().state.volume_max);
        if !(0..=max).contains(&req.volume) {
            return Err(ApiError::BadRequest(format!(
                "volume must be between 0 and {}, got {}",
                max, req.volume
            )));
        }
    }
    state.relay.set_volume(req.volume, req.relative).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/player/repeat_context
pub async fn repeat_context(
    State(state): State<AppState>,
    Json(req): Json<FlagRequest>,
) -> ApiResult<StatusCode> {
    state.relay.set_repeat_context(req.value).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/player/repeat_track
pub async fn repeat_track(
    State(state): State<AppState>,
    Json(req): Json<FlagRequest>,
) -> ApiResult<StatusCode> {
    state.relay.set_repeat_track(req.value).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/player/shuffle_context
pub async fn shuffle_context(
    State(state): State<AppState>,
    Json(req): Json<FlagRequest>,
) -> ApiResult<StatusCode> {
    state.relay.set_shuffle_context(req.value).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/player/add_to_queue
pub async fn add_to_queue(
    State(state): State<AppState>,
    Json(req): Json<QueueRequest>,
) -> ApiResult<StatusCode> {
    require_spotify_uri(&req.uri)?;
    state.relay.add_to_queue(&req.uri).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn player_routes() -> Router<AppState> {
    Router::new()
        .route("/api/player/play", post(play))
        .route("/api/player/resume", post(resume))
        .route("/api/player/pause", post(pause))
        .route("/api/player/playpause", post(play_pause))
        .route("/api/player/next", post(next))
        .route("/api/player/prev", post(previous))
        .route("/api/player/seek", post(seek))
        .route("/api/player/volume", post(volume))
        .route("/api/player/repeat_context", post(repeat_context))
        .route("/api/player/repeat_track", post(repeat_track))
        .route("/api/player/shuffle_context", post(shuffle_context))
        .route("/api/player/add_to_queue", post(add_to_queue))
}
