use hub_chain::ChainError;
use hub_database::DbError;
use hub_service::ServiceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// Bad construction input. Fatal, the engine is not created.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("sync engine already started")]
    AlreadyStarted,

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl SyncError {
    pub fn is_store_closed(&self) -> bool {
        matches!(self, SyncError::Database(DbError::Closed))
    }

    /// An empty on-chain slot. A store miss on update is not included.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::Chain(e) if e.is_not_found())
    }

    pub fn is_routing(&self) -> bool {
        match self {
            SyncError::Chain(e) => e.is_routing(),
            SyncError::Service(e) => e.is_routing(),
            _ => false,
        }
    }
}
