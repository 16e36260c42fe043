//! Debounced invalidation scheduling.
//!
//! Change events arrive in bursts (a page of messages, a batch of backend
//! writes landing together). Recomputing a visible aggregate once per event
//! would waste round-trips, so stale-signals are coalesced: the first
//! signal for a key arms a timer, further signals for that key are no-ops
//! while the timer is pending, and the bound action runs exactly once when
//! the window expires. Distinct keys are fully independent.
//!
//! The presence check and insert happen under one lock acquisition with no
//! await in between, which is the whole mutual-exclusion story: at most one
//! pending timer per key.

use futures_util::future::BoxFuture;
use log::trace;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Default coalescing window; empirically enough to absorb a realistic
/// burst without the aggregate feeling stale.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(250);

#[derive(Default)]
pub struct InvalidationScheduler {
    timers: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl InvalidationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a timer for `key` unless one is already pending.
    ///
    /// On expiry the handle is cleared first, then `action` runs, so a
    /// signal arriving during the recomputation schedules a fresh pass.
    /// Returns `false` (and drops `action`) when a timer was already
    /// pending; the pending one still fires once, at its original
    /// schedule.
    pub async fn schedule(
        self: &Arc<Self>,
        key: &str,
        window: Duration,
        action: BoxFuture<'static, ()>,
    ) -> bool {
        let mut timers = self.timers.lock().await;
        if timers.contains_key(key) {
            trace!(target: "Sync/Debounce", "Timer for '{key}' already pending, coalescing");
            return false;
        }

        let this = self.clone();
        let owned_key = key.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            this.timers.lock().await.remove(&owned_key);
            action.await;
        });
        timers.insert(key.to_string(), handle);
        true
    }

    /// Drop the pending timer for `key`, if any, without running its
    /// action. Used when a key must refresh out of band (e.g. the user
    /// just closed a chat and the next signal should fire immediately).
    pub async fn cancel(&self, key: &str) -> bool {
        match self.timers.lock().await.remove(key) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub async fn is_pending(&self, key: &str) -> bool {
        self.timers.lock().await.contains_key(key)
    }

    /// Abort all pending timers. Called on engine shutdown.
    pub async fn shutdown(&self) {
        let mut timers = self.timers.lock().await;
        for (_, handle) in timers.drain() {
            handle.abort();
        }
    }
}
