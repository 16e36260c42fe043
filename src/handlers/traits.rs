use crate::engine::SyncEngine;
use crate::types::events::{ChangeEvent, Table};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for processing change events of one subscribed table.
///
/// Each handler owns the reaction to a single table (messages, likes,
/// applications, notifications), keeping the routing logic out of the
/// engine core and making new tables cheap to add.
#[async_trait]
pub trait ChangeHandler: Send + Sync {
    /// The table this handler is responsible for.
    fn table(&self) -> Table;

    /// Process an event that already passed the relevance filter.
    async fn handle(&self, engine: Arc<SyncEngine>, event: &ChangeEvent);
}
