use hub_service::ServiceError;
use thiserror::Error;

use crate::binding::BindingError;

#[derive(Debug, Error)]
pub enum ChainError {
    /// Routing (unknown alias, malformed ID), validation and merge errors.
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("community {community_id} belongs to chain {got}, not {expected}")]
    ChainMismatch {
        community_id: String,
        expected: String,
        got: String,
    },

    #[error("no contract configured for chain {0}")]
    NoContract(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("local ID {local_id} is beyond the next contract ID {next}")]
    IdOutOfRange { local_id: u64, next: u64 },

    #[error("failed to initialize client for chain {chain}: {reason}")]
    ClientInit { chain: String, reason: String },

    #[error("failed to initialize contract on chain {chain}: {reason}")]
    ContractInit { chain: String, reason: String },

    #[error("no private key configured")]
    NoPrivateKey,

    #[error("failed to send transaction: {0}")]
    SendTransaction(String),

    #[error("rpc call failed: {0}")]
    Rpc(#[from] BindingError),

    #[error("unknown census type: {0}")]
    UnknownCensusType(u8),

    #[error("invalid on-chain data: {0}")]
    InvalidOnchainData(String),
}

impl ChainError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ChainError::NotFound(_))
    }

    /// Caller or data bug: the ID points at the wrong place. Never retried.
    pub fn is_routing(&self) -> bool {
        match self {
            ChainError::Service(e) => e.is_routing(),
            ChainError::ChainMismatch { .. } | ChainError::NoContract(_) => true,
            _ => false,
        }
    }
}
