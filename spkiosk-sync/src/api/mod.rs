//! HTTP API handlers for spkiosk-sync

pub mod health;
pub mod player;
pub mod sse;
pub mod state;

pub use health::health_routes;
pub use player::player_routes;
pub use state::state_routes;
