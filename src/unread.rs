//! Unread message aggregation.
//!
//! Computes the total unread count the tab badge shows: direct messages
//! addressed to the user plus, for every group room the user participates
//! in, the messages newer than that room's base time. The computation is a
//! pure function of authoritative state at recomputation time; it never
//! applies event deltas, so arrival order and duplicate delivery cannot
//! skew it.
//!
//! Round-trips are bounded by a small constant regardless of room count:
//! one room-list fetch, one batched read-status lookup, one batched
//! message lookup keyed by the global minimum base time (then filtered per
//! room client-side), and one DM count.

use crate::error::Result;
use crate::store::DataFacade;
use crate::types::{RoomId, UserId};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

/// The timestamp below which messages in a room are not counted as unread.
///
/// Prefer the explicit read marker; without one, use the earlier of when
/// the user joined and when the room was created, so a founding member
/// sees messages from the room's inception while a late joiner is not
/// flooded with the whole backlog.
pub fn base_time(
    last_read: Option<DateTime<Utc>>,
    joined_at: DateTime<Utc>,
    room_created_at: DateTime<Utc>,
) -> DateTime<Utc> {
    let implicit = joined_at.min(room_created_at);
    match last_read {
        Some(marker) => marker.max(implicit),
        None => implicit,
    }
}

pub struct UnreadAggregator {
    facade: Arc<dyn DataFacade>,
    user_id: UserId,
    count_tx: watch::Sender<u64>,
}

impl UnreadAggregator {
    pub fn new(facade: Arc<dyn DataFacade>, user_id: UserId) -> Self {
        let (count_tx, _) = watch::channel(0);
        Self {
            facade,
            user_id,
            count_tx,
        }
    }

    /// Read-only view of the aggregate for the rendering layer.
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.count_tx.subscribe()
    }

    pub fn current(&self) -> u64 {
        *self.count_tx.borrow()
    }

    /// Recompute from authoritative state and publish the result.
    ///
    /// A failed fetch keeps the previously published count in place (no
    /// flicker to zero); the next triggering event retries.
    pub async fn recompute(&self) {
        match self.compute().await {
            Ok(total) => {
                debug!(target: "Sync/Unread", "Unread total for {}: {total}", self.user_id);
                self.count_tx.send_if_modified(|current| {
                    if *current != total {
                        *current = total;
                        true
                    } else {
                        false
                    }
                });
            }
            Err(e) => {
                warn!(
                    target: "Sync/Unread",
                    "Unread recompute for {} failed, keeping previous count: {e}", self.user_id
                );
            }
        }
    }

    async fn compute(&self) -> Result<u64> {
        let direct = self.facade.direct_unread_count(&self.user_id).await?;

        let rooms = self.facade.rooms_for_user(&self.user_id).await?;
        let group_rooms: Vec<_> = rooms.iter().filter(|r| r.is_group).collect();
        if group_rooms.is_empty() {
            return Ok(direct);
        }

        let room_ids: Vec<RoomId> = group_rooms.iter().map(|r| r.id.clone()).collect();

        // One batched lookup for all read markers.
        let statuses = self.facade.read_statuses(&self.user_id, &room_ids).await?;
        let markers: HashMap<&str, DateTime<Utc>> = statuses
            .iter()
            .filter_map(|s| s.last_read_at.map(|t| (s.room_id.as_str(), t)))
            .collect();

        let bases: HashMap<&str, DateTime<Utc>> = group_rooms
            .iter()
            .map(|room| {
                let base = base_time(
                    markers.get(room.id.as_str()).copied(),
                    room.joined_at,
                    room.created_at,
                );
                (room.id.as_str(), base)
            })
            .collect();

        // One batched lookup from the global minimum base time; per-room
        // filtering happens client-side against each room's own base.
        let min_base = match bases.values().min() {
            Some(min) => *min,
            None => return Ok(direct),
        };
        let messages = self.facade.messages_since(&room_ids, min_base).await?;

        let grouped = messages
            .iter()
            .filter(|m| m.sender_id != self.user_id)
            .filter(|m| {
                m.room_id
                    .as_deref()
                    .and_then(|room| bases.get(room))
                    .is_some_and(|base| m.created_at > *base)
            })
            .count() as u64;

        Ok(direct + grouped)
    }
}
