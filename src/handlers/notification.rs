use super::traits::ChangeHandler;
use crate::engine::SyncEngine;
use crate::types::events::{ChangeEvent, Table};
use crate::types::rows::NotificationRow;
use async_trait::async_trait;
use std::sync::Arc;

/// Bumps the notifications revision so the rendering layer refetches its
/// feed. The revision is debounced under its own key, independent from
/// the unread and room-list timers.
pub struct NotificationHandler;

#[async_trait]
impl ChangeHandler for NotificationHandler {
    fn table(&self) -> Table {
        Table::Notification
    }

    async fn handle(&self, engine: Arc<SyncEngine>, event: &ChangeEvent) {
        if event.decode_new::<NotificationRow>().is_none() {
            return;
        }
        engine.schedule_notifications_refresh().await;
    }
}
