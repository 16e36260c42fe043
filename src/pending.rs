//! In-flight request deduplication.
//!
//! [`PendingRequestRegistry`] guarantees at most one outstanding
//! asynchronous computation per key. Concurrent callers for the same key
//! share the leader's future instead of starting their own. The check-and-
//! insert is synchronous (no await between the presence check and the
//! insert), which is what makes the one-per-key invariant hold in a
//! cooperative scheduler.
//!
//! The registry entry is removed from inside the shared computation itself,
//! guarded so the cleanup runs on success, failure, or cancellation. The
//! removal therefore happens before any awaiter observes the result: a
//! caller arriving after that point starts a fresh computation rather than
//! attaching to a settled one.

use dashmap::DashMap;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use std::hash::Hash;
use std::sync::Arc;

type SharedResult<V> = Shared<BoxFuture<'static, V>>;

pub struct PendingRequestRegistry<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    in_flight: Arc<DashMap<K, SharedResult<V>>>,
}

impl<K, V> Default for PendingRequestRegistry<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> PendingRequestRegistry<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Join the outstanding computation for `key`, or start one from
    /// `make` if none exists. All concurrent callers receive a clone of
    /// the same result.
    pub fn get_or_run<F>(&self, key: K, make: F) -> SharedResult<V>
    where
        F: FnOnce() -> BoxFuture<'static, V>,
    {
        let entry = self.in_flight.entry(key.clone()).or_insert_with(|| {
            let map = Arc::clone(&self.in_flight);
            let fut = make();
            async move {
                // Unconditional removal on settle or drop.
                let _cleanup = scopeguard::guard((map, key), |(map, key)| {
                    map.remove(&key);
                });
                fut.await
            }
            .boxed()
            .shared()
        });
        let shared = entry.clone();
        drop(entry);
        shared
    }

    /// Number of computations currently outstanding.
    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_run() {
        let registry: Arc<PendingRequestRegistry<String, u32>> =
            Arc::new(PendingRequestRegistry::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..5 {
            let registry = registry.clone();
            let runs = runs.clone();
            tasks.push(tokio::spawn(async move {
                registry
                    .get_or_run("k".to_string(), move || {
                        runs.fetch_add(1, Ordering::SeqCst);
                        async move {
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            42u32
                        }
                        .boxed()
                    })
                    .await
            }));
        }

        for task in tasks {
            assert_eq!(task.await.unwrap(), 42);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        // Entry is gone once the computation settled.
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_settled_key_runs_again() {
        let registry: PendingRequestRegistry<&'static str, Option<u32>> =
            PendingRequestRegistry::new();
        let runs = Arc::new(AtomicUsize::new(0));

        // A failed computation (None) must not lock the key out.
        let runs1 = runs.clone();
        let first = registry
            .get_or_run("k", move || {
                runs1.fetch_add(1, Ordering::SeqCst);
                async move { None }.boxed()
            })
            .await;
        assert_eq!(first, None);

        let runs2 = runs.clone();
        let second = registry
            .get_or_run("k", move || {
                runs2.fetch_add(1, Ordering::SeqCst);
                async move { Some(7) }.boxed()
            })
            .await;
        assert_eq!(second, Some(7));
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_distinct_keys_run_independently() {
        let registry: PendingRequestRegistry<&'static str, u32> = PendingRequestRegistry::new();
        let a = registry.get_or_run("a", || async { 1 }.boxed()).await;
        let b = registry.get_or_run("b", || async { 2 }.boxed()).await;
        assert_eq!((a, b), (1, 2));
    }
}
