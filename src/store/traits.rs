//! External store boundaries.
//!
//! The engine talks to the outside world through two narrow traits: a
//! query/fetch facade over the relational backend and a small key-value
//! store for per-user persisted state. Every facade read is bounded by an
//! id list or a time threshold; the engine never issues unfiltered scans.

use crate::error::Result;
use crate::types::rows::{MessageRow, ReadStatus, RoomRow};
use crate::types::{Profile, RoomId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Query/fetch facade over the persistent store.
#[async_trait]
pub trait DataFacade: Send + Sync {
    /// Point lookup of a user's profile. `Ok(None)` means the user does not
    /// exist (deleted account); errors are transient fetch failures.
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>>;

    /// Point check: does `from` have an outgoing like on `to`?
    async fn has_outgoing_like(&self, from: &str, to: &str) -> Result<bool>;

    /// Full mutual-like counterpart set for `user_id`, computed from
    /// authoritative data. Used by the match reconciliation pass.
    async fn mutual_like_ids(&self, user_id: &str) -> Result<Vec<UserId>>;

    /// All rooms where `user_id` is the owner or an approved member, with
    /// the caller's own `joined_at` filled in per room.
    async fn rooms_for_user(&self, user_id: &str) -> Result<Vec<RoomRow>>;

    /// Batched read-marker lookup for `user_id` across `room_ids`. Rooms
    /// without a marker are simply absent from the result.
    async fn read_statuses(&self, user_id: &str, room_ids: &[RoomId])
    -> Result<Vec<ReadStatus>>;

    /// Batched message lookup across `room_ids`, bounded below by `since`
    /// (exclusive). One round-trip regardless of room count.
    async fn messages_since(
        &self,
        room_ids: &[RoomId],
        since: DateTime<Utc>,
    ) -> Result<Vec<MessageRow>>;

    /// Count-only lookup: direct messages addressed to `user_id` with no
    /// room id and not marked read.
    async fn direct_unread_count(&self, user_id: &str) -> Result<u64>;
}

/// Durable per-user key-value store (device-local).
///
/// Read-modify-write is not atomic across process crashes; callers must
/// keep their updates idempotent.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;
    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()>;
}
