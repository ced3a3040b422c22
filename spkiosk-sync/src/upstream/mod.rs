//! Upstream connector
//!
//! Owns the single WebSocket connection to the daemon's event stream.
//!
//! Socket activity is not handled in callbacks. The socket task turns it
//! into [`SocketEvent`]s on a channel, and one dispatch loop consumes them
//! together with the reconnect timer and the keepalive watchdog. That loop
//! is the only writer of connection state and the only caller of
//! `StateStore::apply_delta`, so deltas land in receive order.

mod backoff;
mod connector;
mod socket;

pub use backoff::Backoff;
pub use connector::{Connector, Dispatcher};
pub use socket::{SocketEvent, TaggedEvent};
