//! Event relevance filtering.
//!
//! The realtime channel delivers row changes for every user of the
//! backend, not just this client. This filter is the cheap front gate:
//! a pure, synchronous predicate over raw row fields, evaluated before
//! any decode, cache write, identity resolution, or timer scheduling.

use crate::types::events::ChangeEvent;
use std::collections::HashSet;

/// An event concerns this client iff its row was sent by the current user
/// (echo from another session), addressed to the current user, or belongs
/// to a conversation in the membership set. Checks are ordered cheapest
/// first; everything else short-circuits with no side effects.
pub fn is_relevant(event: &ChangeEvent, current_user: &str, membership: &HashSet<String>) -> bool {
    if event.new_row_str("sender_id") == Some(current_user) {
        return true;
    }
    if event.new_row_str("receiver_id") == Some(current_user) {
        return true;
    }
    if let Some(room_id) = event.new_row_str("room_id") {
        return membership.contains(room_id);
    }
    false
}
