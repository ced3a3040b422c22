//! # spkiosk common library
//!
//! Shared code for the kiosk services:
//! - Player state model (PlayerState, TrackMetadata, ConnectionState)
//! - HTTP API request/response types
//! - TOML configuration loading
//! - Error types

pub mod api;
pub mod config;
pub mod error;
pub mod player;

pub use error::{Error, Result};
pub use player::{ConnectionState, PlayerState, Snapshot, StateVersion, TrackMetadata};
