use std::path::PathBuf;

/// Core error type for the stock notifier.
///
/// Adapter crates map their specific errors (sqlx, teloxide) into this type so
/// the poll loop can log and degrade consistently instead of terminating.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("inventory source unavailable after {attempts} attempt(s): {reason}")]
    SourceUnavailable { attempts: u32, reason: String },

    #[error("inventory query failed: {0}")]
    Query(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("persistence failure: {path}: {reason}")]
    Persistence { path: PathBuf, reason: String },

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
