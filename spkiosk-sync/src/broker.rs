//! Poll broker
//!
//! Reconciles push-driven state changes with pull-driven long-poll callers.
//! A caller that is behind gets the current snapshot immediately; a caller
//! that is up to date parks until the next change or its timeout.
//!
//! Every change wakes **all** parked waiters with the same snapshot, without
//! comparing each waiter's own version. All waiters share one version space,
//! so per-waiter filtering would never skip anyone.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::store::StateStore;
use spkiosk_common::{Snapshot, StateVersion};

/// A parked long-poll caller
struct PendingWaiter {
    tx: oneshot::Sender<Arc<Snapshot>>,
    registered_at_version: StateVersion,
}

/// Registry of parked long-poll callers
#[derive(Default)]
pub struct PollBroker {
    waiters: Mutex<Vec<PendingWaiter>>,
}

impl PollBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PendingWaiter>> {
        // The waiter list has no invariants a panicking holder could break
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait until the store's version exceeds `last_version` or `timeout` elapses
    ///
    /// Always resolves with a snapshot; on timeout it is whatever is current
    /// (possibly the version the caller already had).
    pub async fn poll_state(
        &self,
        store: &StateStore,
        last_version: StateVersion,
        timeout: Duration,
    ) -> Arc<Snapshot> {
        // Check-and-register under the waiter lock. The store swaps its
        // snapshot before taking this lock to notify, so a change is either
        // visible here or will find this waiter registered.
        let rx = {
            let mut waiters = self.lock();
            let current = store.snapshot();
            if current.version > last_version {
                trace!(last_version, version = current.version, "Poll answered immediately");
                return current;
            }

            waiters.retain(|w| !w.tx.is_closed());
            let (tx, rx) = oneshot::channel();
            waiters.push(PendingWaiter {
                tx,
                registered_at_version: current.version,
            });
            debug!(
                last_version,
                pending = waiters.len(),
                "Poll parked until next change"
            );
            rx
        };

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(snapshot)) => snapshot,
            // Timed out, or the broker dropped the waiter without sending
            _ => store.snapshot(),
        }
    }

    /// Resolve every pending waiter with `snapshot`
    ///
    /// Called by the store after each accepted change.
    pub fn notify(&self, snapshot: &Arc<Snapshot>) {
        let waiters = std::mem::take(&mut *self.lock());
        if waiters.is_empty() {
            return;
        }

        let mut woken = 0usize;
        for waiter in waiters {
            trace!(
                registered_at = waiter.registered_at_version,
                version = snapshot.version,
                "Waking waiter"
            );
            // A waiter whose caller timed out or went away has a closed receiver
            if waiter.tx.send(Arc::clone(snapshot)).is_ok() {
                woken += 1;
            }
        }
        debug!(woken, version = snapshot.version, "Woke long-poll waiters");
    }

    /// Number of registered waiters (including ones whose caller has left)
    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::normalize;

    fn store() -> StateStore {
        StateStore::new(Arc::new(PollBroker::new()))
    }

    fn apply(store: &StateStore, raw: &str) {
        store.apply_delta(&normalize(raw).unwrap().unwrap());
    }

    #[tokio::test]
    async fn test_behind_caller_answered_immediately() {
        let store = store();
        apply(&store, r#"{"type":"active"}"#);
        apply(&store, r#"{"type":"playing"}"#);

        let snapshot = store
            .broker()
            .poll_state(&store, 0, Duration::from_secs(3600))
            .await;
        assert_eq!(snapshot.version, 2);
        assert!(snapshot.state.is_active);
        assert_eq!(store.broker().pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_current_caller_waits_for_timeout() {
        let store = store();
        let started = tokio::time::Instant::now();

        let snapshot = store
            .broker()
            .poll_state(&store, 0, Duration::from_millis(2500))
            .await;

        assert!(started.elapsed() >= Duration::from_millis(2500));
        assert_eq!(snapshot.version, 0);
        assert_eq!(*snapshot, Snapshot::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_wakes_all_waiters_with_same_snapshot() {
        let store = Arc::new(store());
        let mut handles = Vec::new();
        for _ in 0..5 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .broker()
                    .poll_state(&store, 0, Duration::from_secs(30))
                    .await
            }));
        }

        // Let every poller park
        while store.broker().pending_count() < 5 {
            tokio::task::yield_now().await;
        }

        apply(&store, r#"{"type":"volume","value":42}"#);

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        assert!(results.iter().all(|s| s.version == 1 && s.state.volume == 42));
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(store.broker().pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_waiters_are_pruned() {
        let store = store();

        // Caller gives up before any change arrives
        let abandoned = tokio::time::timeout(
            Duration::from_millis(10),
            store.broker().poll_state(&store, 0, Duration::from_secs(30)),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(store.broker().pending_count(), 1);

        // The next registration drops it
        let _ = tokio::time::timeout(
            Duration::from_millis(10),
            store.broker().poll_state(&store, 0, Duration::from_secs(30)),
        )
        .await;
        assert_eq!(store.broker().pending_count(), 1);

        // And a change clears the rest without complaint
        apply(&store, r#"{"type":"paused"}"#);
        assert_eq!(store.broker().pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_ahead_of_store_waits() {
        // A caller reporting a version from a previous process lifetime
        let store = store();
        let snapshot = store
            .broker()
            .poll_state(&store, 99, Duration::from_millis(100))
            .await;
        assert_eq!(snapshot.version, 0);
    }
}
