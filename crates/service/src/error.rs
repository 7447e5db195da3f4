use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Every validation failure lands here so callers branch on one kind.
    #[error("invalid community data: {0}")]
    InvalidCommunity(String),

    #[error("community ID mismatch: {existing} != {incoming}")]
    CommunityIdMismatch { existing: String, incoming: String },

    #[error("no admin creator: expected {expected:?}, got {got:?}")]
    NoAdminCreator { expected: Option<u64>, got: u64 },

    #[error("unknown chain alias: {0}")]
    UnknownChainAlias(String),

    #[error("malformed community ID: {0:?}")]
    MalformedCommunityId(String),

    #[error("unknown census type: {0}")]
    UnknownCensusType(String),
}

impl ServiceError {
    pub fn invalid(detail: impl Into<String>) -> Self {
        ServiceError::InvalidCommunity(detail.into())
    }

    pub fn is_invalid_community(&self) -> bool {
        matches!(self, ServiceError::InvalidCommunity(_))
    }

    /// Unknown alias or malformed ID: a caller or data bug, never retried.
    pub fn is_routing(&self) -> bool {
        matches!(
            self,
            ServiceError::UnknownChainAlias(_) | ServiceError::MalformedCommunityId(_)
        )
    }
}
