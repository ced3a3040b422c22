//! Server-Sent Events stream of state changes
//!
//! Push alternative to the long poll: one `state` event per accepted change,
//! carrying the same body as `GET /api/state`. The current snapshot is sent
//! first so a new client never starts empty.

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream, StreamExt};
use spkiosk_common::api::PollResponse;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

use crate::service::SyncService;
use crate::AppState;
use spkiosk_common::Snapshot;

fn to_event(sync: &SyncService, snapshot: &Snapshot) -> Option<Event> {
    let body = PollResponse {
        state: snapshot.state.clone(),
        version: snapshot.version,
        connected: sync.is_connected(),
    };
    match Event::default().event("state").json_data(&body) {
        Ok(event) => Some(event.id(snapshot.version.to_string())),
        Err(e) => {
            warn!("Failed to serialize state event: {}", e);
            None
        }
    }
}

/// GET /api/events
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("New SSE client connected");

    // Subscribe before reading the snapshot so no change falls in between
    let rx = state.sync.subscribe();
    let initial = state.sync.snapshot();
    let initial_version = initial.version;

    let sync = Arc::clone(&state.sync);
    let first = to_event(&sync, &initial).map(Ok::<_, Infallible>);

    let updates = BroadcastStream::new(rx).filter_map(move |result| {
        let sync = Arc::clone(&sync);
        async move {
            match result {
                Ok(snapshot) if snapshot.version > initial_version => {
                    to_event(&sync, &snapshot).map(Ok::<_, Infallible>)
                }
                Ok(_) => None,
                Err(e) => {
                    // Lagged: the next change carries the full state anyway
                    warn!("SSE stream error: {:?}", e);
                    None
                }
            }
        }
    });

    Sse::new(stream::iter(first).chain(updates)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
