use hub_service::ServiceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// The store was closed for the rest of the process lifetime.
    #[error("database is closed")]
    Closed,

    #[error("record {0} already exists")]
    AlreadyExists(String),

    #[error("record {0} not found")]
    NotFound(String),

    #[error("mdbx error: {0}")]
    Mdbx(#[from] libmdbx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("corrupted record {key}: {reason}")]
    Corrupted { key: String, reason: String },

    #[error(transparent)]
    Service(#[from] ServiceError),
}
