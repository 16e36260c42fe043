use super::traits::ChangeHandler;
use crate::engine::SyncEngine;
use crate::types::events::{ChangeEvent, Table};
use crate::types::rows::MessageRow;
use async_trait::async_trait;
use log::trace;
use std::sync::Arc;

/// Reacts to message rows: patches the open conversation's cache, warms
/// the sender's identity for the rendering layer, and schedules the
/// debounced unread and room-list refreshes.
pub struct MessageHandler;

#[async_trait]
impl ChangeHandler for MessageHandler {
    fn table(&self) -> Table {
        Table::Message
    }

    async fn handle(&self, engine: Arc<SyncEngine>, event: &ChangeEvent) {
        let Some(row) = event.decode_new::<MessageRow>() else {
            return;
        };

        if let Some(conversation) = row.conversation_key(engine.user_id()) {
            let outcome = engine.patch_message(&conversation, &row);
            trace!(
                target: "Sync/Messages",
                "Patch for message {} in '{conversation}': {outcome:?}", row.id
            );
        }

        // Warm the identity caches so the bubble renders with a name and
        // avatar without a per-message fetch from the UI.
        if row.sender_id != engine.user_id() {
            engine.resolve_sender(&row.sender_id).await;
        }

        engine.schedule_unread_refresh().await;
        engine.schedule_room_list_refresh().await;
    }
}
