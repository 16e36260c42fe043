use super::traits::ChangeHandler;
use crate::engine::SyncEngine;
use crate::types::events::{ChangeEvent, Table};
use crate::types::rows::{ApplicationRow, ApplicationStatus};
use async_trait::async_trait;
use log::debug;
use std::sync::Arc;

/// Reacts to project-application rows. An approval for the current user
/// changes room membership, so the membership index is rebuilt and the
/// unread aggregate refreshed; any other change only touches the room
/// list the owner is looking at.
pub struct ApplicationHandler;

#[async_trait]
impl ChangeHandler for ApplicationHandler {
    fn table(&self) -> Table {
        Table::Application
    }

    async fn handle(&self, engine: Arc<SyncEngine>, event: &ChangeEvent) {
        let Some(row) = event.decode_new::<ApplicationRow>() else {
            return;
        };

        if row.applicant_id == engine.user_id() && row.status == ApplicationStatus::Approved {
            debug!(
                target: "Sync/Applications",
                "Approved for room {}, rebuilding membership", row.room_id
            );
            engine.refresh_rooms().await;
            engine.schedule_unread_refresh().await;
        }
        engine.schedule_room_list_refresh().await;
    }
}
