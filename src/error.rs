//! Error types for chunkcas

use crate::model::ContentId;
use crate::schema::wire::DecodeError;
use thiserror::Error;

/// Result type alias for chunkcas operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in chunkcas operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Missing object: {0}")]
    MissingObject(ContentId),

    #[error("Not a blob: {0}")]
    NotABlob(String),

    #[error("Unexpected encoding: {0}")]
    UnexpectedEncoding(String),

    #[error("Cannot uncompress chunk {0}: no codec available")]
    UncompressFailed(ContentId),

    #[error("Bad range {start}..{end} for blob of size {size}")]
    BadRange { start: u64, end: u64, size: u64 },

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("Invalid store URL: {0}")]
    InvalidUrl(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Worker pool error: {0}")]
    Worker(String),
}
