//! Change-event model for the realtime subscription stream.
//!
//! The backend delivers one event per affected row, per subscribed table.
//! Events are at-least-once and carry no ordering guarantee across tables,
//! so everything downstream treats them as "something changed" hints and
//! recomputes from authoritative state rather than applying deltas.

use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Tables the engine subscribes to on the realtime channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Message,
    Like,
    Application,
    Notification,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Message => "message",
            Table::Like => "like",
            Table::Application => "application",
            Table::Notification => "notification",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Insert,
    Update,
}

/// One row-change notification from the realtime stream.
///
/// Rows arrive as raw JSON; handlers decode them into typed rows with
/// [`ChangeEvent::decode_new`] and drop the event if the payload is
/// malformed. Events are ephemeral and never persisted by the engine.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub table: Table,
    pub operation: Operation,
    pub old_row: Option<serde_json::Value>,
    pub new_row: serde_json::Value,
}

impl ChangeEvent {
    pub fn insert(table: Table, new_row: serde_json::Value) -> Self {
        Self {
            table,
            operation: Operation::Insert,
            old_row: None,
            new_row,
        }
    }

    pub fn update(
        table: Table,
        old_row: Option<serde_json::Value>,
        new_row: serde_json::Value,
    ) -> Self {
        Self {
            table,
            operation: Operation::Update,
            old_row,
            new_row,
        }
    }

    /// Decode the new row into a typed struct.
    ///
    /// Returns `None` after logging if the payload is missing expected
    /// fields; a malformed event must never take down the pipeline.
    pub fn decode_new<T: DeserializeOwned>(&self) -> Option<T> {
        match serde_json::from_value(self.new_row.clone()) {
            Ok(row) => Some(row),
            Err(e) => {
                warn!(target: "Sync/Events", "Dropping malformed {} row: {e}", self.table.as_str());
                None
            }
        }
    }

    /// Cheap string-field peek into the new row, used by the relevance
    /// filter before any typed decode happens.
    pub fn new_row_str(&self, field: &str) -> Option<&str> {
        self.new_row.get(field).and_then(serde_json::Value::as_str)
    }
}
