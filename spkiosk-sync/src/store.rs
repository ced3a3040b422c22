//! State store
//!
//! Single source of truth for the current player snapshot and its version.
//! Snapshots are immutable: each accepted delta builds a new `Arc<Snapshot>`
//! and swaps it in, so readers never observe a half-applied change.

use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;
use tracing::debug;

use crate::broker::PollBroker;
use crate::normalizer::Delta;
use spkiosk_common::Snapshot;

/// Buffered change notifications per SSE subscriber
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Current snapshot plus change fan-out
pub struct StateStore {
    current: RwLock<Arc<Snapshot>>,
    broker: Arc<PollBroker>,
    changes: broadcast::Sender<Arc<Snapshot>>,
}

impl StateStore {
    /// Empty store at version 0 with default (paused, inactive) state
    pub fn new(broker: Arc<PollBroker>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            current: RwLock::new(Arc::new(Snapshot::default())),
            broker,
            changes,
        }
    }

    /// Current snapshot
    ///
    /// The returned value is shared and immutable; later changes produce a
    /// new snapshot rather than mutating this one.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Merge `delta`, bump the version by exactly one, wake pollers
    ///
    /// The only path that changes the version.
    pub fn apply_delta(&self, delta: &Delta) -> Arc<Snapshot> {
        let next = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            let mut state = current.state.clone();
            delta.apply_to(&mut state);
            let next = Arc::new(Snapshot {
                state,
                version: current.version + 1,
            });
            *current = Arc::clone(&next);
            next
        };

        debug!(version = next.version, "State updated");
        self.broker.notify(&next);
        // No subscribers is fine
        let _ = self.changes.send(Arc::clone(&next));
        next
    }

    /// Subscribe to every accepted change (used by the SSE stream)
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Snapshot>> {
        self.changes.subscribe()
    }

    pub fn broker(&self) -> &Arc<PollBroker> {
        &self.broker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::normalize;

    fn store() -> StateStore {
        StateStore::new(Arc::new(PollBroker::new()))
    }

    fn delta(raw: &str) -> Delta {
        normalize(raw).unwrap().unwrap()
    }

    #[test]
    fn test_starts_at_version_zero_with_defaults() {
        let snapshot = store().snapshot();
        assert_eq!(snapshot.version, 0);
        assert!(snapshot.state.is_paused);
        assert!(!snapshot.state.is_active);
    }

    #[test]
    fn test_version_increments_once_per_delta() {
        let store = store();
        let frames = [
            r#"{"type":"active"}"#,
            r#"{"type":"playing"}"#,
            r#"{"type":"active"}"#,
            r#"{"type":"seek","position":5}"#,
            r#"{"type":"stopped"}"#,
        ];
        for (i, frame) in frames.iter().enumerate() {
            let snapshot = store.apply_delta(&delta(frame));
            assert_eq!(snapshot.version, i as u64 + 1);
            assert_eq!(store.snapshot().version, i as u64 + 1);
        }
    }

    #[test]
    fn test_old_snapshots_are_not_mutated() {
        let store = store();
        let before = store.snapshot();
        store.apply_delta(&delta(r#"{"type":"playing"}"#));

        assert_eq!(before.version, 0);
        assert!(before.state.is_paused);
        assert!(!store.snapshot().state.is_paused);
    }

    #[test]
    fn test_stopped_clears_track_regardless_of_prior_state() {
        let store = store();
        store.apply_delta(&delta(
            r#"{"type":"metadata","uri":"spotify:track:X","name":"Song","position":1000,"duration":200000}"#,
        ));
        store.apply_delta(&delta(r#"{"type":"playing"}"#));
        let playing = store.snapshot();
        assert_eq!(playing.state.current_track.as_ref().unwrap().uri, "spotify:track:X");
        assert_eq!(playing.state.position, 1000);
        assert_eq!(playing.state.duration, 200000);

        store.apply_delta(&delta(r#"{"type":"stopped"}"#));
        let stopped = store.snapshot();
        assert!(stopped.state.current_track.is_none());
        assert!(!stopped.state.is_active);
    }

    #[tokio::test]
    async fn test_subscribers_see_each_change() {
        let store = store();
        let mut rx = store.subscribe();
        store.apply_delta(&delta(r#"{"type":"shuffle_context","value":true}"#));
        let change = rx.recv().await.unwrap();
        assert_eq!(change.version, 1);
        assert!(change.state.shuffle_context);
    }
}
