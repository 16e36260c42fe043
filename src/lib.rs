//! Realtime incremental-cache synchronization engine for the CoBuild
//! mobile client.
//!
//! Consumes the backend's row-change notification stream and keeps the
//! client's derived views — unread counters, room summaries, match queue,
//! sender identities, cached message pages — correct and cheap to refresh
//! without re-querying the dataset on every event. Events are assumed
//! at-least-once with no ordering guarantee, so every aggregate is
//! recomputed from authoritative state rather than patched incrementally;
//! the one exception, the optimistic message patch, is explicitly
//! best-effort and superseded by the next full fetch.

pub mod cache;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod matches;
pub mod membership;
pub mod patcher;
pub mod pending;
pub mod relevance;
pub mod store;
pub mod types;
pub mod unread;

pub use engine::{EngineConfig, SyncEngine};
pub use types::events::{ChangeEvent, Operation, Table};
