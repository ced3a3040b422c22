//! State synchronization service
//!
//! Wires the connector, store and poll broker together behind one object
//! with an explicit start/stop lifecycle. Several services can coexist
//! (tests run many at once); nothing here is global.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::broker::PollBroker;
use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::store::StateStore;
use crate::upstream::Connector;
use spkiosk_common::api::PollResponse;
use spkiosk_common::{ConnectionState, Snapshot, StateVersion};

struct Running {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Owns the upstream connection and serves versioned snapshots to pollers
pub struct SyncService {
    config: SyncConfig,
    store: Arc<StateStore>,
    connection: Arc<watch::Sender<ConnectionState>>,
    running: Mutex<Option<Running>>,
}

impl SyncService {
    pub fn new(config: SyncConfig) -> Self {
        let store = Arc::new(StateStore::new(Arc::new(PollBroker::new())));
        let (connection, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            config,
            store,
            connection: Arc::new(connection),
            running: Mutex::new(None),
        }
    }

    /// Spawn the dispatch loop and make the first connection attempt
    ///
    /// Fails without spawning anything if the config is invalid. Must be
    /// called from within a tokio runtime.
    pub fn start(&self) -> Result<()> {
        self.config.validate()?;

        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.is_some() {
            return Err(Error::InvalidState("sync service already started".to_string()));
        }

        info!(url = %self.config.events_url, "Starting state sync service");
        let (shutdown, shutdown_rx) = watch::channel(false);
        let connector = Connector::new(
            self.config.clone(),
            Arc::clone(&self.store),
            Arc::clone(&self.connection),
        );
        let task = tokio::spawn(connector.run(shutdown_rx));
        *running = Some(Running { shutdown, task });
        Ok(())
    }

    /// Close the upstream connection and wait for the dispatch loop to exit
    ///
    /// State and version are kept; a later `start` continues from them.
    pub async fn stop(&self) {
        let running = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(running) = running else {
            return;
        };

        let _ = running.shutdown.send(true);
        if let Err(e) = running.task.await {
            warn!("Sync dispatch loop ended abnormally: {}", e);
        }
        info!("State sync service stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Long-poll for a state newer than `last_version`
    ///
    /// Resolves immediately when the caller is behind, otherwise on the next
    /// change or after `timeout` (configured default when `None`). Never fails.
    pub async fn poll_state(
        &self,
        last_version: StateVersion,
        timeout: Option<Duration>,
    ) -> PollResponse {
        let timeout = timeout.unwrap_or(self.config.poll_timeout);
        let snapshot = self
            .store
            .broker()
            .poll_state(&self.store, last_version, timeout)
            .await;
        PollResponse {
            state: snapshot.state.clone(),
            version: snapshot.version,
            connected: self.is_connected(),
        }
    }

    /// Whether the upstream socket is currently open
    ///
    /// Independent of `PlayerState::is_active`: the daemon may still hold a
    /// Connect session while this service is reconnecting.
    pub fn is_connected(&self) -> bool {
        self.connection_state().is_connected()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.connection.borrow()
    }

    /// Watch connection state transitions
    pub fn subscribe_connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.store.snapshot()
    }

    /// Receive every state change as it is applied
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Snapshot>> {
        self.store.subscribe()
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }
}
