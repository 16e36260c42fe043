use thiserror::Error;

/// Errors crossing the external store boundaries (fetch facade and
/// key-value store). Everything inside the engine degrades gracefully on
/// these; none of them surface to the user.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend fetch failed: {0}")]
    Fetch(String),
    #[error("key-value store failed: {0}")]
    KeyValue(String),
    #[error("serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
