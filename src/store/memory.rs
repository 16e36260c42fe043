//! In-memory store implementations.
//!
//! Deterministic fixtures for unit and integration tests: seedable data,
//! injectable fetch failure, and call counters for asserting the engine's
//! batching and dedup behavior. Also usable as a throwaway backend when
//! embedding the engine without a real device store.

use crate::error::{Result, StoreError};
use crate::store::traits::{DataFacade, KeyValueStore};
use crate::types::rows::{MessageRow, ReadStatus, RoomRow};
use crate::types::{Profile, RoomId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryFacade {
    profiles: RwLock<HashMap<UserId, Profile>>,
    /// (from, to) pairs of outgoing likes.
    likes: RwLock<Vec<(UserId, UserId)>>,
    rooms: RwLock<HashMap<UserId, Vec<RoomRow>>>,
    read_statuses: RwLock<Vec<ReadStatus>>,
    messages: RwLock<Vec<MessageRow>>,
    failing: AtomicBool,
    profile_latency: RwLock<Duration>,
    profile_fetches: AtomicUsize,
    status_batches: AtomicUsize,
    message_batches: AtomicUsize,
}

impl MemoryFacade {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_profile(&self, profile: Profile) {
        self.profiles
            .write()
            .await
            .insert(profile.user_id.clone(), profile);
    }

    pub async fn add_like(&self, from: &str, to: &str) {
        self.likes
            .write()
            .await
            .push((from.to_string(), to.to_string()));
    }

    pub async fn set_rooms(&self, user_id: &str, rooms: Vec<RoomRow>) {
        self.rooms.write().await.insert(user_id.to_string(), rooms);
    }

    pub async fn set_read_status(&self, status: ReadStatus) {
        let mut statuses = self.read_statuses.write().await;
        statuses.retain(|s| !(s.room_id == status.room_id && s.user_id == status.user_id));
        statuses.push(status);
    }

    pub async fn push_message(&self, message: MessageRow) {
        self.messages.write().await.push(message);
    }

    /// While set, every facade method fails with a transient fetch error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Artificial latency on profile fetches, for overlapping-request tests.
    pub async fn set_profile_latency(&self, latency: Duration) {
        *self.profile_latency.write().await = latency;
    }

    pub fn profile_fetch_count(&self) -> usize {
        self.profile_fetches.load(Ordering::SeqCst)
    }

    pub fn status_batch_count(&self) -> usize {
        self.status_batches.load(Ordering::SeqCst)
    }

    pub fn message_batch_count(&self) -> usize {
        self.message_batches.load(Ordering::SeqCst)
    }

    fn check_failing(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Fetch("injected failure".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DataFacade for MemoryFacade {
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        self.profile_fetches.fetch_add(1, Ordering::SeqCst);
        let latency = *self.profile_latency.read().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.check_failing()?;
        Ok(self.profiles.read().await.get(user_id).cloned())
    }

    async fn has_outgoing_like(&self, from: &str, to: &str) -> Result<bool> {
        self.check_failing()?;
        Ok(self
            .likes
            .read()
            .await
            .iter()
            .any(|(f, t)| f == from && t == to))
    }

    async fn mutual_like_ids(&self, user_id: &str) -> Result<Vec<UserId>> {
        self.check_failing()?;
        let likes = self.likes.read().await;
        let mut mutual: Vec<UserId> = likes
            .iter()
            .filter(|(f, t)| f == user_id && likes.iter().any(|(f2, t2)| f2 == t && t2 == f))
            .map(|(_, t)| t.clone())
            .collect();
        mutual.sort();
        mutual.dedup();
        Ok(mutual)
    }

    async fn rooms_for_user(&self, user_id: &str) -> Result<Vec<RoomRow>> {
        self.check_failing()?;
        Ok(self
            .rooms
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn read_statuses(
        &self,
        user_id: &str,
        room_ids: &[RoomId],
    ) -> Result<Vec<ReadStatus>> {
        self.status_batches.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;
        Ok(self
            .read_statuses
            .read()
            .await
            .iter()
            .filter(|s| s.user_id == user_id && room_ids.contains(&s.room_id))
            .cloned()
            .collect())
    }

    async fn messages_since(
        &self,
        room_ids: &[RoomId],
        since: DateTime<Utc>,
    ) -> Result<Vec<MessageRow>> {
        self.message_batches.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;
        Ok(self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| {
                m.created_at > since
                    && m.room_id
                        .as_ref()
                        .is_some_and(|room| room_ids.contains(room))
            })
            .cloned()
            .collect())
    }

    async fn direct_unread_count(&self, user_id: &str) -> Result<u64> {
        self.check_failing()?;
        Ok(self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| {
                m.room_id.is_none() && m.receiver_id.as_deref() == Some(user_id) && !m.is_read
            })
            .count() as u64)
    }
}

#[derive(Default)]
pub struct MemoryKv {
    entries: RwLock<HashMap<String, serde_json::Value>>,
    failing: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::KeyValue("injected failure".into()));
        }
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::KeyValue("injected failure".into()));
        }
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}
