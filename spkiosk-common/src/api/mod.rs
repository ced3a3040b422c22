//! API module for shared HTTP API types
//!
//! Request/response shapes used by the sync service's HTTP surface and by
//! anything that talks to it (kiosk UI, tests).

pub mod types;

pub use types::{
    FlagRequest, HealthResponse, PlayRequest, PollQuery, PollResponse, QueueRequest, SeekRequest,
    StatusResponse, VolumeRequest,
};
