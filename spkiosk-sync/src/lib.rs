//! # spkiosk-sync
//!
//! State synchronization service for a Spotify-Connect kiosk.
//!
//! **Purpose:** Hold one WebSocket connection to the Connect daemon's event
//! stream, fold its events into a versioned player snapshot, and serve that
//! snapshot to long-poll clients. Player commands are relayed to the
//! daemon's HTTP API.
//!
//! **Architecture:** upstream connector → event normalizer → state store →
//! poll broker, driven by a single tokio dispatch loop.

use axum::Router;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod api;
pub mod broker;
pub mod config;
pub mod error;
pub mod normalizer;
pub mod relay;
pub mod service;
pub mod store;
pub mod upstream;

pub use config::{ServiceConfig, SyncConfig};
pub use error::{Error, Result};
pub use relay::CommandRelay;
pub use service::SyncService;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub sync: Arc<SyncService>,
    pub relay: CommandRelay,
}

impl AppState {
    pub fn new(sync: Arc<SyncService>, relay: CommandRelay) -> Self {
        Self { sync, relay }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::state_routes())
        .merge(api::player_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
