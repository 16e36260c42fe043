//! Optimistic message-cache patching.
//!
//! When a message event arrives for a conversation whose page cache is
//! already populated, the message is prepended to the first page so an
//! open chat updates without a refetch. Best-effort and non-authoritative:
//! it never deletes or reorders existing entries, skips conversations with
//! no cache (they fetch fresh on open), and suppresses duplicates (the
//! sending client's own optimistic insert may have applied the message
//! already). The next authoritative fetch supersedes whatever it did.

use crate::cache::QueryCache;
use crate::types::rows::MessageRow;
use log::trace;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Applied,
    Duplicate,
    NoCache,
}

pub struct OptimisticPatcher {
    cache: Arc<QueryCache>,
}

impl OptimisticPatcher {
    pub fn new(cache: Arc<QueryCache>) -> Self {
        Self { cache }
    }

    /// Prepend `message` to the first cached page of `conversation`, if
    /// that cache exists and the first page has no message with this id.
    pub fn apply(&self, conversation: &str, message: &MessageRow) -> PatchOutcome {
        let outcome = self.cache.with_message_pages(conversation, |pages| {
            if pages.is_empty() {
                pages.push(Vec::new());
            }
            let first = &mut pages[0];
            if first.iter().any(|m| m.id == message.id) {
                PatchOutcome::Duplicate
            } else {
                first.insert(0, message.clone());
                PatchOutcome::Applied
            }
        });
        match outcome {
            Some(outcome) => outcome,
            None => {
                trace!(
                    target: "Sync/Patcher",
                    "No cached pages for '{conversation}', skipping patch"
                );
                PatchOutcome::NoCache
            }
        }
    }
}
