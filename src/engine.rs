//! Engine assembly.
//!
//! One [`SyncEngine`] instance per authenticated session owns every piece
//! of synchronization state: the shared query cache, the identity
//! resolver, the membership index, the debounce timers, the unread
//! aggregate, and the match queue. Nothing here is a global; everything is
//! constructed explicitly and injected, so each invariant is testable in
//! isolation with the in-memory backends.
//!
//! The run loop consumes the change-event channel until the channel
//! closes or shutdown is signaled. Each event passes the relevance filter
//! against a membership snapshot, then dispatches through the per-table
//! handler router.

use crate::cache::QueryCache;
use crate::debounce::{self, InvalidationScheduler};
use crate::handlers::{
    ChangeRouter, application::ApplicationHandler, like::LikeHandler, message::MessageHandler,
    notification::NotificationHandler,
};
use crate::identity::SenderIdentityResolver;
use crate::matches::MatchEngine;
use crate::membership::RoomMembershipIndex;
use crate::patcher::{OptimisticPatcher, PatchOutcome};
use crate::relevance;
use crate::store::{DataFacade, KeyValueStore};
use crate::types::events::ChangeEvent;
use crate::types::rows::MessageRow;
use crate::types::{SenderIdentity, UserId};
use crate::unread::UnreadAggregator;
use futures_util::FutureExt;
use log::{debug, info, trace, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, mpsc, watch};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub user_id: UserId,
    /// Coalescing window for stale-signal bursts.
    pub debounce_window: Duration,
}

impl EngineConfig {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            debounce_window: debounce::DEFAULT_WINDOW,
        }
    }

    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }
}

pub struct SyncEngine {
    user_id: UserId,
    debounce_window: Duration,
    facade: Arc<dyn DataFacade>,
    cache: Arc<QueryCache>,
    resolver: SenderIdentityResolver,
    scheduler: Arc<InvalidationScheduler>,
    membership: RoomMembershipIndex,
    unread: Arc<UnreadAggregator>,
    matches: Arc<MatchEngine>,
    patcher: OptimisticPatcher,
    router: ChangeRouter,
    room_list_rev: watch::Sender<u64>,
    notifications_rev: watch::Sender<u64>,
    shutdown_notifier: Notify,
}

impl SyncEngine {
    pub fn new(
        config: EngineConfig,
        facade: Arc<dyn DataFacade>,
        kv: Arc<dyn KeyValueStore>,
    ) -> Arc<Self> {
        let cache = Arc::new(QueryCache::new());
        let resolver = SenderIdentityResolver::new(facade.clone(), cache.clone());
        let unread = Arc::new(UnreadAggregator::new(
            facade.clone(),
            config.user_id.clone(),
        ));
        let matches = Arc::new(MatchEngine::new(
            facade.clone(),
            kv,
            config.user_id.clone(),
        ));
        let patcher = OptimisticPatcher::new(cache.clone());

        let mut router = ChangeRouter::new();
        router.register(Arc::new(MessageHandler));
        router.register(Arc::new(LikeHandler));
        router.register(Arc::new(ApplicationHandler));
        router.register(Arc::new(NotificationHandler));

        Arc::new(Self {
            user_id: config.user_id,
            debounce_window: config.debounce_window,
            facade,
            cache,
            resolver,
            scheduler: Arc::new(InvalidationScheduler::new()),
            membership: RoomMembershipIndex::new(),
            unread,
            matches,
            patcher,
            router,
            room_list_rev: watch::channel(0).0,
            notifications_rev: watch::channel(0).0,
            shutdown_notifier: Notify::new(),
        })
    }

    /// One-time warm-up after login: load the persisted viewed-set, build
    /// the membership index, reconcile missed matches, and compute the
    /// initial unread count.
    pub async fn start(self: &Arc<Self>) {
        info!(target: "Sync/Engine", "Starting sync engine for {}", self.user_id);
        self.matches.load_viewed().await;
        self.refresh_rooms().await;
        self.matches.reconcile().await;
        self.unread.recompute().await;
    }

    /// App came back to the foreground: live events may have been missed
    /// while suspended, so self-heal from authoritative state.
    pub async fn on_foreground(self: &Arc<Self>) {
        debug!(target: "Sync/Engine", "Foreground reconciliation for {}", self.user_id);
        self.matches.reconcile().await;
        self.unread.recompute().await;
    }

    /// Consume the change-event stream until it closes or shutdown is
    /// signaled. Spawn this once per session.
    pub async fn run(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<ChangeEvent>) {
        info!(target: "Sync/Engine", "Event loop running");
        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(event) => self.handle_event(event).await,
                        None => {
                            debug!(target: "Sync/Engine", "Event channel closed, exiting loop");
                            break;
                        }
                    }
                }
                _ = self.shutdown_notifier.notified() => {
                    debug!(target: "Sync/Engine", "Shutdown signaled, exiting loop");
                    break;
                }
            }
        }
        self.scheduler.shutdown().await;
    }

    /// Filter and dispatch a single event.
    pub async fn handle_event(self: &Arc<Self>, event: ChangeEvent) {
        let membership = self.membership.snapshot().await;
        if !relevance::is_relevant(&event, &self.user_id, &membership) {
            trace!(
                target: "Sync/Engine",
                "Dropping irrelevant {} event", event.table.as_str()
            );
            return;
        }
        if !self.router.dispatch(self.clone(), &event).await {
            debug!(
                target: "Sync/Engine",
                "No handler for table '{}'", event.table.as_str()
            );
        }
    }

    /// Rebuild the membership index from the authoritative room list. A
    /// failed fetch keeps the previous set; membership is only ever
    /// replaced by fresh data.
    pub async fn refresh_rooms(&self) {
        match self.facade.rooms_for_user(&self.user_id).await {
            Ok(rooms) => {
                debug!(target: "Sync/Engine", "Membership rebuilt from {} rooms", rooms.len());
                self.membership.rebuild(&rooms).await;
            }
            Err(e) => {
                warn!(target: "Sync/Engine", "Room list fetch failed, keeping membership: {e}");
            }
        }
    }

    fn unread_key(&self) -> String {
        format!("unread:{}", self.user_id)
    }

    /// Signal that the unread aggregate is stale. Bursts within the
    /// debounce window coalesce into one recomputation.
    pub async fn schedule_unread_refresh(self: &Arc<Self>) {
        let unread = self.unread.clone();
        self.scheduler
            .schedule(
                &self.unread_key(),
                self.debounce_window,
                async move { unread.recompute().await }.boxed(),
            )
            .await;
    }

    /// The user closed a chat view; its messages just became read, so the
    /// badge must refresh now rather than after the debounce window.
    pub async fn chat_closed(self: &Arc<Self>) {
        let key = self.unread_key();
        self.scheduler.cancel(&key).await;
        let unread = self.unread.clone();
        self.scheduler
            .schedule(
                &key,
                Duration::ZERO,
                async move { unread.recompute().await }.boxed(),
            )
            .await;
    }

    /// Debounced bump of the room-list revision; the rendering layer
    /// refetches its room summaries when this changes.
    pub async fn schedule_room_list_refresh(self: &Arc<Self>) {
        let tx = self.room_list_rev.clone();
        self.scheduler
            .schedule(
                &format!("room-list:{}", self.user_id),
                self.debounce_window,
                async move {
                    tx.send_modify(|rev| *rev += 1);
                }
                .boxed(),
            )
            .await;
    }

    /// Debounced bump of the notifications revision, under its own key.
    pub async fn schedule_notifications_refresh(self: &Arc<Self>) {
        let tx = self.notifications_rev.clone();
        self.scheduler
            .schedule(
                &format!("notifications:{}", self.user_id),
                self.debounce_window,
                async move {
                    tx.send_modify(|rev| *rev += 1);
                }
                .boxed(),
            )
            .await;
    }

    pub(crate) fn patch_message(&self, conversation: &str, message: &MessageRow) -> PatchOutcome {
        self.patcher.apply(conversation, message)
    }

    pub(crate) async fn resolve_sender(&self, sender_id: &str) -> Option<SenderIdentity> {
        self.resolver.resolve(sender_id).await
    }

    /// Write-through after the current user edits their own profile.
    pub async fn refresh_own_identity(&self, identity: SenderIdentity) {
        self.resolver.refresh(identity).await;
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The shared query cache; the rendering layer reads it, only the
    /// engine writes it.
    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn matches(&self) -> &Arc<MatchEngine> {
        &self.matches
    }

    pub fn unread_watch(&self) -> watch::Receiver<u64> {
        self.unread.watch()
    }

    pub fn room_list_watch(&self) -> watch::Receiver<u64> {
        self.room_list_rev.subscribe()
    }

    pub fn notifications_watch(&self) -> watch::Receiver<u64> {
        self.notifications_rev.subscribe()
    }

    pub fn shutdown(&self) {
        info!(target: "Sync/Engine", "Shutdown requested");
        // notify_one stores a permit, so a shutdown signaled before the
        // run loop reaches its select is not lost.
        self.shutdown_notifier.notify_one();
    }
}
