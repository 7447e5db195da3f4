//! Boundary to the contract binding.
//!
//! The binding is a typed RPC stub: it knows the contract ABI and nothing about
//! communities. Everything above it (ID routing, zero-value detection, census
//! tags, transaction parameters) lives in the gateway and the mapper.

use std::sync::Arc;

use alloy::primitives::{Address, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawToken {
    pub blockchain: String,
    pub contract_address: Address,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawCensus {
    pub census_type: u8,
    pub tokens: Vec<RawToken>,
    pub channel: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawMetadata {
    pub name: String,
    pub image_uri: String,
    pub group_chat_url: String,
    pub channels: Vec<String>,
    pub notifications: bool,
}

/// Community tuple as stored by the contract. An unused slot reads back as
/// the all-zero value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawCommunity {
    pub metadata: RawMetadata,
    pub census: RawCensus,
    pub guardians: Vec<U256>,
    pub create_election_permission: u8,
    pub disabled: bool,
    pub funds: U256,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawResults {
    pub question: String,
    pub options: Vec<String>,
    pub date: String,
    pub tally: Vec<Vec<U256>>,
    pub turnout: U256,
    pub total_voting_power: U256,
    pub participants: Vec<U256>,
    pub census_root: Vec<u8>,
    pub census_uri: String,
}

/// Parameters attached to every write transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxOpts {
    pub from: Address,
    pub nonce: u64,
    pub gas_tip_cap: u128,
    pub gas_limit: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct BindingError(pub String);

impl BindingError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Calls exposed by the community hub contract on one chain.
#[async_trait]
pub trait HubBinding: Send + Sync {
    async fn next_community_id(&self) -> Result<U256, BindingError>;

    async fn community(&self, community_id: U256) -> Result<RawCommunity, BindingError>;

    /// Returns the transaction hash once the node accepted the transaction.
    async fn set_community(
        &self,
        community_id: U256,
        community: RawCommunity,
        opts: TxOpts,
    ) -> Result<B256, BindingError>;

    async fn result(&self, community_id: U256, election_id: B256) -> Result<RawResults, BindingError>;

    async fn set_result(
        &self,
        community_id: U256,
        election_id: B256,
        results: RawResults,
        opts: TxOpts,
    ) -> Result<B256, BindingError>;

    async fn pending_nonce(&self, account: Address) -> Result<u64, BindingError>;

    async fn suggest_gas_tip(&self) -> Result<u128, BindingError>;
}

/// Builds bindings. Split in two steps so a broken endpoint and a broken
/// contract attachment surface as different errors.
pub trait Connector {
    type Client;

    /// Builds the RPC client for one chain. When a signer is given the client
    /// must be able to sign transactions with it.
    fn client(&self, endpoint: &str, signer: Option<&PrivateKeySigner>) -> Result<Self::Client, BindingError>;

    fn bind(&self, client: Self::Client, address: Address) -> Result<Arc<dyn HubBinding>, BindingError>;
}
