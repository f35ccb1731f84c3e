use rusqlite::ErrorCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by the store engine, its backends and the HTTP client.
///
/// Every variant is cheap to clone: a coalesced unit of work hands the same
/// outcome to the leader and all of its followers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("nil value error")]
    NilValue,

    #[error("zero value error")]
    ZeroValue,

    #[error("existing entry")]
    Existing,

    #[error("entry not found")]
    NotFound,

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("data corrupted")]
    DataCorrupted,

    #[error("disk full error")]
    DiskFull,

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("in-flight operation abandoned before completion")]
    Abandoned,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseCorrupt) | Some(ErrorCode::NotADatabase) => {
                StoreError::DataCorrupted
            }
            Some(ErrorCode::DiskFull) => StoreError::DiskFull,
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Http(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        StoreError::Internal(format!("blocking task failed: {}", err))
    }
}
