//! Sender identity resolution.
//!
//! Resolves a user id to the small display identity shown next to a
//! message bubble. Three-tier lookup: local memory cache, then the shared
//! query cache (the rendering layer reads the same one), then a remote
//! fetch that is deduplicated through [`PendingRequestRegistry`] so a burst
//! of messages from one unseen sender costs exactly one round-trip.

use crate::cache::QueryCache;
use crate::pending::PendingRequestRegistry;
use crate::store::DataFacade;
use crate::types::{SenderIdentity, UserId};
use futures_util::FutureExt;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct SenderIdentityResolver {
    facade: Arc<dyn DataFacade>,
    shared_cache: Arc<QueryCache>,
    local: Arc<RwLock<HashMap<UserId, SenderIdentity>>>,
    in_flight: PendingRequestRegistry<UserId, Option<SenderIdentity>>,
}

impl SenderIdentityResolver {
    pub fn new(facade: Arc<dyn DataFacade>, shared_cache: Arc<QueryCache>) -> Self {
        Self {
            facade,
            shared_cache,
            local: Arc::new(RwLock::new(HashMap::new())),
            in_flight: PendingRequestRegistry::new(),
        }
    }

    /// Resolve `user_id` to a display identity.
    ///
    /// Never fails outward: a remote error yields `None` and leaves no
    /// cache entry, so the next call retries. A successful resolution is
    /// written through to both the local cache and the shared query cache.
    pub async fn resolve(&self, user_id: &str) -> Option<SenderIdentity> {
        if let Some(hit) = self.local.read().await.get(user_id) {
            return Some(hit.clone());
        }

        // Shared query cache hit gets promoted into the local cache.
        if let Some(hit) = self.shared_cache.identity(user_id) {
            self.local
                .write()
                .await
                .insert(user_id.to_string(), hit.clone());
            return Some(hit);
        }

        let facade = self.facade.clone();
        let shared_cache = self.shared_cache.clone();
        let local = self.local.clone();
        let uid = user_id.to_string();
        self.in_flight
            .get_or_run(user_id.to_string(), move || {
                async move {
                    match facade.fetch_profile(&uid).await {
                        Ok(Some(profile)) => {
                            let identity = SenderIdentity::from(&profile);
                            local.write().await.insert(uid, identity.clone());
                            shared_cache.put_identity(identity.clone());
                            Some(identity)
                        }
                        Ok(None) => {
                            debug!(target: "Sync/Identity", "No profile found for {uid}");
                            None
                        }
                        Err(e) => {
                            warn!(target: "Sync/Identity", "Profile fetch for {uid} failed: {e}");
                            None
                        }
                    }
                }
                .boxed()
            })
            .await
    }

    /// Write-through update, e.g. after the current user edits their own
    /// profile. Both caches observe the new identity immediately.
    pub async fn refresh(&self, identity: SenderIdentity) {
        self.local
            .write()
            .await
            .insert(identity.user_id.clone(), identity.clone());
        self.shared_cache.put_identity(identity);
    }

    #[cfg(test)]
    pub(crate) fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }
}
