//! State observation endpoints
//!
//! `GET /api/state` is the long poll: pass the last version you saw and the
//! request is held until something newer exists or the timeout passes.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use spkiosk_common::api::{PollQuery, PollResponse, StatusResponse};
use std::time::Duration;
use tracing::debug;

use crate::AppState;

/// GET /api/state?version=<u64>&timeout=<ms>
pub async fn poll_state(
    State(state): State<AppState>,
    Query(query): Query<PollQuery>,
) -> Json<PollResponse> {
    debug!(version = query.version, timeout = ?query.timeout, "Long-poll request");
    let timeout = query.timeout.map(Duration::from_millis);
    Json(state.sync.poll_state(query.version, timeout).await)
}

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let connection_state = state.sync.connection_state();
    Json(StatusResponse {
        connected: connection_state.is_connected(),
        connection_state,
        version: state.sync.snapshot().version,
    })
}

pub fn state_routes() -> Router<AppState> {
    Router::new()
        .route("/api/state", get(poll_state))
        .route("/api/status", get(get_status))
        .route("/api/events", get(super::sse::event_stream))
}
