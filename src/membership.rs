//! Room membership index.
//!
//! Holds the set of conversation identifiers the current user participates
//! in: every room id, plus the partner's user id for one-to-one rooms
//! (inbound message rows reference either, depending on whether the room
//! is a group or a direct conversation). The set is rebuilt wholesale from
//! the authoritative room list and swapped in one write, so concurrent
//! event processing never observes a half-updated membership.

use crate::types::rows::RoomRow;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct RoomMembershipIndex {
    members: RwLock<Arc<HashSet<String>>>,
}

impl RoomMembershipIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole set from the authoritative room list.
    pub async fn rebuild(&self, rooms: &[RoomRow]) {
        let mut set = HashSet::with_capacity(rooms.len() * 2);
        for room in rooms {
            set.insert(room.id.clone());
            if let Some(partner) = &room.partner_id {
                set.insert(partner.clone());
            }
        }
        *self.members.write().await = Arc::new(set);
    }

    /// Cheap snapshot for synchronous lookups during event filtering.
    pub async fn snapshot(&self) -> Arc<HashSet<String>> {
        self.members.read().await.clone()
    }

    pub async fn is_member(&self, id: &str) -> bool {
        self.members.read().await.contains(id)
    }
}
