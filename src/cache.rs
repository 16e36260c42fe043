//! Shared query cache.
//!
//! One cache instance per engine, shared by reference with the rendering
//! layer. Entries are keyed the same way the rendering layer's own
//! data-fetching hooks key their queries, so a write from the engine is
//! visible to already-mounted views without an explicit push channel. The
//! rendering layer reads this cache; only the engine writes it.

use crate::types::rows::MessageRow;
use crate::types::SenderIdentity;
use dashmap::DashMap;

/// Paginated message list for one conversation, newest first within the
/// first page (mirroring the rendering layer's infinite-scroll pages).
pub type MessagePages = Vec<Vec<MessageRow>>;

#[derive(Default)]
pub struct QueryCache {
    identities: DashMap<String, SenderIdentity>,
    room_messages: DashMap<String, MessagePages>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity(&self, user_id: &str) -> Option<SenderIdentity> {
        self.identities.get(user_id).map(|e| e.clone())
    }

    pub fn put_identity(&self, identity: SenderIdentity) {
        self.identities.insert(identity.user_id.clone(), identity);
    }

    pub fn identity_count(&self) -> usize {
        self.identities.len()
    }

    /// Seed (or replace) the cached pages for a conversation. Called by the
    /// rendering layer's fetch path after an authoritative query.
    pub fn put_message_pages(&self, conversation: &str, pages: MessagePages) {
        self.room_messages.insert(conversation.to_string(), pages);
    }

    pub fn message_pages(&self, conversation: &str) -> Option<MessagePages> {
        self.room_messages.get(conversation).map(|e| e.clone())
    }

    pub fn has_message_pages(&self, conversation: &str) -> bool {
        self.room_messages.contains_key(conversation)
    }

    /// Mutate the cached pages for a conversation in place, if present.
    /// Returns `None` without invoking `f` when no cache entry exists.
    pub(crate) fn with_message_pages<R>(
        &self,
        conversation: &str,
        f: impl FnOnce(&mut MessagePages) -> R,
    ) -> Option<R> {
        self.room_messages.get_mut(conversation).map(|mut e| f(&mut e))
    }
}
