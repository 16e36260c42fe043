//! Typed views over backend rows.
//!
//! Field names match the backend's column names one to one so rows decode
//! straight out of a change event or a facade response with serde.

use crate::types::{RoomId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat message. `room_id` is set for group-room messages; direct
/// messages carry `receiver_id` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRow {
    pub id: String,
    pub sender_id: UserId,
    #[serde(default)]
    pub receiver_id: Option<UserId>,
    #[serde(default)]
    pub room_id: Option<RoomId>,
    #[serde(default)]
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
}

impl MessageRow {
    /// The cache key of the conversation this message belongs to: the room
    /// id for group messages, otherwise the DM partner as seen from
    /// `viewer`'s side.
    pub fn conversation_key(&self, viewer: &str) -> Option<String> {
        if let Some(room_id) = &self.room_id {
            return Some(room_id.clone());
        }
        if self.sender_id == viewer {
            self.receiver_id.clone()
        } else {
            Some(self.sender_id.clone())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeRow {
    pub id: String,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

/// A request to join a project room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRow {
    pub id: String,
    pub applicant_id: UserId,
    pub room_id: RoomId,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRow {
    pub id: String,
    pub receiver_id: UserId,
    #[serde(default)]
    pub kind: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One room the current user participates in, as returned by the room-list
/// query. `joined_at` is the caller's own participation time in that room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRow {
    pub id: RoomId,
    pub is_group: bool,
    pub owner_id: UserId,
    /// Counterpart user for one-to-one rooms; `None` for group rooms.
    #[serde(default)]
    pub partner_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub joined_at: DateTime<Utc>,
}

/// Per-user, per-room read marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadStatus {
    pub room_id: RoomId,
    pub user_id: UserId,
    #[serde(default)]
    pub last_read_at: Option<DateTime<Utc>>,
}
