use super::traits::ChangeHandler;
use crate::engine::SyncEngine;
use crate::types::events::{ChangeEvent, Operation, Table};
use crate::types::rows::LikeRow;
use async_trait::async_trait;
use std::sync::Arc;

/// Feeds inbound like inserts into match detection. Updates (unlike,
/// re-like) are left to the reconciliation pass; only a fresh insert can
/// complete a mutual match live.
pub struct LikeHandler;

#[async_trait]
impl ChangeHandler for LikeHandler {
    fn table(&self) -> Table {
        Table::Like
    }

    async fn handle(&self, engine: Arc<SyncEngine>, event: &ChangeEvent) {
        if event.operation != Operation::Insert {
            return;
        }
        let Some(row) = event.decode_new::<LikeRow>() else {
            return;
        };
        engine.matches().on_like_event(&row).await;
    }
}
