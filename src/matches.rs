//! Mutual-match detection and presentation queue.
//!
//! A match exists when two users have liked each other. The live path
//! reacts to an inbound like event with a point query against the current
//! user's own outgoing likes; the reconciliation pass recomputes the full
//! mutual set from authoritative data on each launch/foreground, so a
//! missed or dropped live event self-heals and the live path stays an
//! optimization, never a correctness dependency.
//!
//! Matches are surfaced one at a time. Dismissing the current one persists
//! its counterpart id into the viewed-set BEFORE the queue advances, so an
//! unclean shutdown mid-presentation can re-show at most the match that
//! was on screen, and never silently skips one.

use crate::store::{DataFacade, KeyValueStore};
use crate::types::rows::LikeRow;
use crate::types::{Profile, UserId};
use log::{debug, trace, warn};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};

/// Gap between dismissing one match card and presenting the next, so two
/// presentations never visually overlap.
pub const PRESENTATION_GAP: Duration = Duration::from_millis(400);

#[derive(Default)]
struct QueueState {
    queue: VecDeque<Profile>,
    queued_ids: HashSet<UserId>,
    viewed: HashSet<UserId>,
    presenting: Option<Profile>,
    /// Set between a dismissal and the delayed advance; blocks a racing
    /// enqueue from presenting inside the gap.
    cooling_down: bool,
}

pub struct MatchEngine {
    facade: Arc<dyn DataFacade>,
    kv: Arc<dyn KeyValueStore>,
    user_id: UserId,
    state: Mutex<QueueState>,
    presentation_tx: watch::Sender<Option<Profile>>,
}

impl MatchEngine {
    pub fn new(facade: Arc<dyn DataFacade>, kv: Arc<dyn KeyValueStore>, user_id: UserId) -> Self {
        let (presentation_tx, _) = watch::channel(None);
        Self {
            facade,
            kv,
            user_id,
            state: Mutex::new(QueueState::default()),
            presentation_tx,
        }
    }

    fn viewed_key(&self) -> String {
        format!("viewed-matches:{}", self.user_id)
    }

    /// The match card currently on screen, if any. The rendering layer
    /// watches this and calls [`MatchEngine::dismiss_current`] on dismiss.
    pub fn presentation_watch(&self) -> watch::Receiver<Option<Profile>> {
        self.presentation_tx.subscribe()
    }

    /// Load the persisted viewed-set. Called once at engine start; a
    /// failed or missing read starts with an empty set (re-showing an old
    /// match is a bounded nuisance, not data loss).
    pub async fn load_viewed(&self) {
        let viewed: HashSet<UserId> = match self.kv.get(&self.viewed_key()).await {
            Ok(Some(value)) => match serde_json::from_value::<Vec<UserId>>(value) {
                Ok(ids) => ids.into_iter().collect(),
                Err(e) => {
                    warn!(target: "Sync/Matches", "Corrupt viewed-set, starting empty: {e}");
                    HashSet::new()
                }
            },
            Ok(None) => HashSet::new(),
            Err(e) => {
                warn!(target: "Sync/Matches", "Viewed-set read failed, starting empty: {e}");
                HashSet::new()
            }
        };
        self.state.lock().await.viewed = viewed;
    }

    /// Live-path entry: an inbound like event addressed to the current
    /// user. Checks mutuality with a point query, enriches with the
    /// counterpart profile, then enqueues. Any failure drops the event;
    /// the next reconciliation pass catches it.
    pub async fn on_like_event(self: &Arc<Self>, like: &LikeRow) {
        if like.receiver_id != self.user_id {
            return;
        }

        match self
            .facade
            .has_outgoing_like(&self.user_id, &like.sender_id)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                trace!(target: "Sync/Matches", "Like from {} is not mutual yet", like.sender_id);
                return;
            }
            Err(e) => {
                warn!(target: "Sync/Matches", "Mutuality check failed, deferring to reconciliation: {e}");
                return;
            }
        }

        match self.facade.fetch_profile(&like.sender_id).await {
            Ok(Some(profile)) => {
                self.enqueue(profile).await;
            }
            Ok(None) => {
                debug!(target: "Sync/Matches", "Counterpart {} has no profile", like.sender_id);
            }
            Err(e) => {
                warn!(target: "Sync/Matches", "Match enrichment failed, deferring to reconciliation: {e}");
            }
        }
    }

    /// Recompute the full mutual-like set from authoritative data and
    /// enqueue whatever the viewed-set and queue don't already cover.
    /// Called on launch and app foreground.
    pub async fn reconcile(self: &Arc<Self>) {
        let ids = match self.facade.mutual_like_ids(&self.user_id).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(target: "Sync/Matches", "Reconciliation fetch failed, retrying next foreground: {e}");
                return;
            }
        };

        for id in ids {
            if self.is_known(&id).await {
                continue;
            }
            match self.facade.fetch_profile(&id).await {
                Ok(Some(profile)) => {
                    self.enqueue(profile).await;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(target: "Sync/Matches", "Reconciliation enrichment for {id} failed: {e}");
                }
            }
        }
    }

    async fn is_known(&self, id: &str) -> bool {
        let state = self.state.lock().await;
        state.viewed.contains(id)
            || state.queued_ids.contains(id)
            || state
                .presenting
                .as_ref()
                .is_some_and(|p| p.user_id == id)
    }

    /// Append a counterpart to the queue unless it is already viewed,
    /// queued, or on screen. Presents immediately when nothing is showing.
    /// Returns whether the profile was actually enqueued.
    pub async fn enqueue(self: &Arc<Self>, profile: Profile) -> bool {
        let mut state = self.state.lock().await;
        let id = &profile.user_id;
        if state.viewed.contains(id)
            || state.queued_ids.contains(id)
            || state.presenting.as_ref().is_some_and(|p| &p.user_id == id)
        {
            trace!(target: "Sync/Matches", "Counterpart {id} already known, not enqueueing");
            return false;
        }

        debug!(target: "Sync/Matches", "Queueing match with {id}");
        state.queued_ids.insert(profile.user_id.clone());
        state.queue.push_back(profile);
        self.present_next_locked(&mut state);
        true
    }

    fn present_next_locked(&self, state: &mut QueueState) {
        if state.presenting.is_some() || state.cooling_down {
            return;
        }
        if let Some(profile) = state.queue.pop_front() {
            state.queued_ids.remove(&profile.user_id);
            state.presenting = Some(profile.clone());
            self.presentation_tx.send_replace(Some(profile));
        }
    }

    /// Dismiss the match currently on screen.
    ///
    /// The counterpart id is persisted into the viewed-set before the
    /// queue advances. A persistence failure is logged but the queue still
    /// moves on so the UI stays responsive.
    pub async fn dismiss_current(self: &Arc<Self>) {
        let dismissed = {
            let mut state = self.state.lock().await;
            let Some(profile) = state.presenting.take() else {
                return;
            };
            state.cooling_down = true;
            state.viewed.insert(profile.user_id.clone());
            profile
        };

        if let Err(e) = self.persist_viewed().await {
            warn!(
                target: "Sync/Matches",
                "Viewed-set write for {} failed, advancing anyway: {e}", dismissed.user_id
            );
        }
        self.presentation_tx.send_replace(None);

        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(PRESENTATION_GAP).await;
            let mut state = this.state.lock().await;
            state.cooling_down = false;
            this.present_next_locked(&mut state);
        });
    }

    async fn persist_viewed(&self) -> crate::error::Result<()> {
        let snapshot: Vec<UserId> = {
            let state = self.state.lock().await;
            let mut ids: Vec<UserId> = state.viewed.iter().cloned().collect();
            ids.sort();
            ids
        };
        self.kv
            .set(&self.viewed_key(), serde_json::to_value(snapshot)?)
            .await
    }

    pub async fn queue_len(&self) -> usize {
        self.state.lock().await.queue.len()
    }

    pub async fn is_viewed(&self, id: &str) -> bool {
        self.state.lock().await.viewed.contains(id)
    }
}
