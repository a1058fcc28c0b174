/// LiveGrid error types
///
/// Most grid mutations never fail: configuration mistakes such as sorting a
/// non-sortable column are ignored, and malformed filters degrade to substring
/// matching. The errors below cover the few boundaries where a caller asked
/// for strict behavior or handed us data we cannot ingest.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    /// Only raised when the store runs with `OutOfRangePolicy::Reject`.
    #[error("Index {index} out of range [0, {len})")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type GridResult<T> = Result<T, GridError>;
