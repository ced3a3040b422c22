//! Connection supervision: dispatch loop, reconnect backoff, watchdog

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use super::backoff::Backoff;
use super::socket::{SocketEvent, SocketHandle, TaggedEvent};
use crate::config::SyncConfig;
use crate::normalizer::normalize;
use crate::store::StateStore;
use spkiosk_common::ConnectionState;

/// Socket events buffered between the socket task and the dispatch loop
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How long `stop` waits for a socket to send its close frame
const SOCKET_CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Characters of a dropped frame that make it into the log
const LOGGED_FRAME_CHARS: usize = 200;

/// Leading part of a frame, cut on a char boundary
fn frame_preview(text: &str) -> &str {
    match text.char_indices().nth(LOGGED_FRAME_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Reacts to socket events: connection state, backoff, state deltas
///
/// Holds no I/O, so the whole event-handling policy can be driven directly
/// from tests.
pub struct Dispatcher {
    store: Arc<StateStore>,
    connection: Arc<watch::Sender<ConnectionState>>,
    backoff: Backoff,
    generation: u64,
    /// Generation whose events are still accepted (cleared after its terminal event)
    live_generation: Option<u64>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<StateStore>,
        connection: Arc<watch::Sender<ConnectionState>>,
        backoff: Backoff,
    ) -> Self {
        Self {
            store,
            connection,
            backoff,
            generation: 0,
            live_generation: None,
        }
    }

    /// Start a new connection attempt; returns its generation
    ///
    /// Any earlier socket is superseded: its events are ignored from here on.
    pub fn begin_attempt(&mut self) -> u64 {
        self.generation += 1;
        self.live_generation = Some(self.generation);
        self.set_state(ConnectionState::Connecting);
        self.generation
    }

    /// Handle one socket event; returns the reconnect delay to schedule, if any
    pub fn handle(&mut self, tagged: TaggedEvent) -> Option<Duration> {
        if self.live_generation != Some(tagged.generation) {
            trace!(
                generation = tagged.generation,
                current = self.generation,
                "Ignoring event from superseded socket"
            );
            return None;
        }

        match tagged.event {
            SocketEvent::Opened => {
                info!(generation = tagged.generation, "Connected to event stream");
                self.backoff.reset();
                self.set_state(ConnectionState::Connected);
                None
            }
            SocketEvent::Frame(text) => {
                self.handle_frame(&text);
                None
            }
            SocketEvent::Closed(reason) => {
                warn!(reason = reason.as_deref().unwrap_or(""), "Event stream closed");
                Some(self.connection_lost())
            }
            SocketEvent::Failed(error) => {
                warn!(%error, "Event stream connection failed");
                Some(self.connection_lost())
            }
        }
    }

    /// Normalize a frame and apply it; bad frames are dropped
    pub fn handle_frame(&self, text: &str) {
        match normalize(text) {
            Ok(Some(delta)) => {
                self.store.apply_delta(&delta);
            }
            Ok(None) => trace!(frame = frame_preview(text), "Ignoring unknown event type"),
            Err(e) => warn!(
                error = %e,
                len = text.len(),
                frame = frame_preview(text),
                "Discarding malformed event"
            ),
        }
    }

    fn connection_lost(&mut self) -> Duration {
        self.live_generation = None;
        self.set_state(ConnectionState::Disconnected);
        let delay = self.backoff.next_delay();
        info!(
            delay_ms = delay.as_millis() as u64,
            attempt = self.backoff.attempts(),
            "Scheduling reconnect"
        );
        delay
    }

    /// Mark the connection down without scheduling a reconnect (service stop)
    pub fn detach(&mut self) {
        self.live_generation = None;
        self.set_state(ConnectionState::Disconnected);
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.connection.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "Connection state changed");
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.connection.borrow()
    }
}

/// Supervisor owning the socket and the dispatch loop
pub struct Connector {
    config: SyncConfig,
    dispatcher: Dispatcher,
    events_tx: mpsc::Sender<TaggedEvent>,
    events_rx: mpsc::Receiver<TaggedEvent>,
    socket: Option<SocketHandle>,
}

impl Connector {
    pub fn new(
        config: SyncConfig,
        store: Arc<StateStore>,
        connection: Arc<watch::Sender<ConnectionState>>,
    ) -> Self {
        let backoff = Backoff::new(config.reconnect_initial, config.reconnect_max);
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            dispatcher: Dispatcher::new(store, connection, backoff),
            events_tx,
            events_rx,
            socket: None,
        }
    }

    /// Tear down any existing socket and start a fresh attempt
    fn connect(&mut self) {
        if let Some(socket) = self.socket.take() {
            debug!("Tearing down previous socket before reconnecting");
            socket.close();
        }

        let generation = self.dispatcher.begin_attempt();
        info!(url = %self.config.events_url, generation, "Connecting to event stream");
        self.socket = Some(SocketHandle::spawn(
            self.config.events_url.clone(),
            self.config.connect_timeout,
            generation,
            self.events_tx.clone(),
        ));
    }

    /// Dispatch loop; runs until `shutdown` flips to true or its sender is dropped
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        self.connect();

        let period = self.config.watchdog_interval;
        let mut watchdog = tokio::time::interval_at(Instant::now() + period, period);
        watchdog.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut reconnect_at: Option<Instant> = None;

        loop {
            let deadline = reconnect_at;
            let reconnect_timer = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                Some(tagged) = self.events_rx.recv() => {
                    if let Some(delay) = self.dispatcher.handle(tagged) {
                        self.socket = None;
                        reconnect_at = Some(Instant::now() + delay);
                    }
                }
                _ = reconnect_timer => {
                    reconnect_at = None;
                    self.connect();
                }
                _ = watchdog.tick() => {
                    if !self.dispatcher.connection_state().is_connected() {
                        info!(
                            state = %self.dispatcher.connection_state(),
                            "Watchdog: event stream not connected, forcing reconnect"
                        );
                        reconnect_at = None;
                        self.connect();
                    }
                }
            }
        }

        info!("Stopping event stream connector");
        self.dispatcher.detach();
        if let Some(socket) = self.socket.take() {
            socket.shutdown(SOCKET_CLOSE_GRACE).await;
        }
    }
}
