use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use hub_service::{community_id, validate, ChainRegistry, Community, HubResults};
use tracing::{debug, info, warn};

use crate::binding::{BindingError, Connector, HubBinding, TxOpts};
use crate::error::ChainError;
use crate::mapper;

/// Timeout for each call made while preparing a write transaction.
pub const TX_PARAMS_TIMEOUT: Duration = Duration::from_secs(10);

/// Gas limit attached to every write.
pub const DEFAULT_GAS_LIMIT: u64 = 10_000_000;

/// What the sync engine needs from one chain's contract.
#[async_trait]
pub trait CommunityContract: Send + Sync {
    fn chain_alias(&self) -> &str;

    fn chain_id(&self) -> u64;

    /// First local ID the contract has not assigned yet.
    async fn next_contract_id(&self) -> Result<u64, ChainError>;

    async fn community(&self, community_id: &str) -> Result<Community, ChainError>;

    async fn set_community(&self, community: &Community) -> Result<(), ChainError>;

    async fn results(&self, local_id: u64, election_id: B256) -> Result<HubResults, ChainError>;

    async fn set_results(&self, local_id: u64, election_id: B256, results: &HubResults) -> Result<(), ChainError>;
}

/// Settings for one chain + contract pair.
#[derive(Clone, Debug)]
pub struct GatewayParams {
    pub chain_alias: String,
    pub chain_id: u64,
    pub endpoint: String,
    pub contract: Address,
    /// Hex encoded, with or without `0x`. Without it the gateway is read-only.
    pub private_key: Option<String>,
}

/// [`CommunityContract`] over one deployed hub contract.
pub struct ContractGateway {
    chain_alias: String,
    chain_id: u64,
    contract: Address,
    registry: ChainRegistry,
    binding: Arc<dyn HubBinding>,
    signer: Option<Address>,
}

impl ContractGateway {
    pub fn connect<C: Connector>(
        connector: &C,
        registry: ChainRegistry,
        params: GatewayParams,
    ) -> Result<Self, ChainError> {
        let signer = params.private_key.as_deref().and_then(|key| {
            match key.trim_start_matches("0x").parse::<PrivateKeySigner>() {
                Ok(signer) => Some(signer),
                Err(e) => {
                    warn!(chain = %params.chain_alias, error = %e, "invalid private key, contract is read-only");
                    None
                }
            }
        });
        if params.private_key.is_none() {
            info!(chain = %params.chain_alias, "no private key configured, contract is read-only");
        }

        let client = connector
            .client(&params.endpoint, signer.as_ref())
            .map_err(|e| ChainError::ClientInit {
                chain: params.chain_alias.clone(),
                reason: e.to_string(),
            })?;
        let binding = connector
            .bind(client, params.contract)
            .map_err(|e| ChainError::ContractInit {
                chain: params.chain_alias.clone(),
                reason: e.to_string(),
            })?;

        info!(chain = %params.chain_alias, contract = %params.contract, "contract gateway ready");

        Ok(Self {
            chain_alias: params.chain_alias,
            chain_id: params.chain_id,
            contract: params.contract,
            registry,
            binding,
            signer: signer.map(|signer| signer.address()),
        })
    }

    pub fn contract_address(&self) -> Address {
        self.contract
    }

    pub fn is_read_only(&self) -> bool {
        self.signer.is_none()
    }

    /// Resolves `community_id` and checks it belongs to this chain.
    fn local_id(&self, community_id: &str) -> Result<u64, ChainError> {
        let (alias, _) = community_id::decode(community_id)
            .ok_or_else(|| hub_service::ServiceError::MalformedCommunityId(community_id.to_string()))?;
        if alias != self.chain_alias {
            return Err(ChainError::ChainMismatch {
                community_id: community_id.to_string(),
                expected: self.chain_alias.clone(),
                got: alias.to_string(),
            });
        }
        Ok(community_id::resolve(&self.registry, community_id)?.local_id)
    }

    /// Fresh nonce and gas tip for the configured signer. Nothing is sent
    /// with stale or default parameters.
    async fn transact_opts(&self) -> Result<TxOpts, ChainError> {
        let from = self.signer.ok_or(ChainError::NoPrivateKey)?;
        let nonce = with_timeout("pending nonce", self.binding.pending_nonce(from)).await?;
        let gas_tip_cap = with_timeout("gas tip", self.binding.suggest_gas_tip()).await?;

        Ok(TxOpts {
            from,
            nonce,
            gas_tip_cap,
            gas_limit: DEFAULT_GAS_LIMIT,
        })
    }
}

async fn with_timeout<T>(
    what: &str,
    call: impl Future<Output = Result<T, BindingError>>,
) -> Result<T, ChainError> {
    match tokio::time::timeout(TX_PARAMS_TIMEOUT, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(ChainError::SendTransaction(format!("{what}: {e}"))),
        Err(_) => Err(ChainError::SendTransaction(format!("{what}: timed out"))),
    }
}

#[async_trait]
impl CommunityContract for ContractGateway {
    fn chain_alias(&self) -> &str {
        &self.chain_alias
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn next_contract_id(&self) -> Result<u64, ChainError> {
        let next = self.binding.next_community_id().await?;
        if next.is_zero() {
            // uninitialized counter, 1 is the first assignable ID
            return Ok(1);
        }
        u64::try_from(next).map_err(|_| ChainError::InvalidOnchainData(format!("next community ID {next}")))
    }

    async fn community(&self, community_id: &str) -> Result<Community, ChainError> {
        let local_id = self.local_id(community_id)?;
        let next = self.next_contract_id().await?;
        if local_id > next {
            return Err(ChainError::IdOutOfRange { local_id, next });
        }

        let raw = self.binding.community(U256::from(local_id)).await?;
        // a community may hold zero funds, so both must be empty
        if raw.metadata.name.is_empty() && raw.funds.is_zero() {
            return Err(ChainError::NotFound(format!("community {community_id}")));
        }
        mapper::community_from_raw(community_id, self.chain_id, raw)
    }

    async fn set_community(&self, community: &Community) -> Result<(), ChainError> {
        if self.signer.is_none() {
            return Err(ChainError::NoPrivateKey);
        }
        let local_id = self.local_id(&community.community_id)?;
        let mut community = community.clone();
        validate(&mut community)?;

        let opts = self.transact_opts().await?;
        let tx = self
            .binding
            .set_community(U256::from(local_id), mapper::community_to_raw(&community), opts)
            .await
            .map_err(|e| ChainError::SendTransaction(e.to_string()))?;

        debug!(community_id = %community.community_id, nonce = opts.nonce, %tx, "community written on-chain");
        Ok(())
    }

    async fn results(&self, local_id: u64, election_id: B256) -> Result<HubResults, ChainError> {
        let community_id = community_id::encode(&self.chain_alias, local_id);
        let raw = self.binding.result(U256::from(local_id), election_id).await?;
        if raw.question.is_empty() && raw.options.is_empty() {
            return Err(ChainError::NotFound(format!("results of {election_id} in {community_id}")));
        }
        mapper::results_from_raw(&community_id, election_id, raw)
    }

    async fn set_results(&self, local_id: u64, election_id: B256, results: &HubResults) -> Result<(), ChainError> {
        let opts = self.transact_opts().await?;
        let tx = self
            .binding
            .set_result(U256::from(local_id), election_id, mapper::results_to_raw(results), opts)
            .await
            .map_err(|e| ChainError::SendTransaction(e.to_string()))?;

        debug!(chain = %self.chain_alias, local_id, %election_id, %tx, "results written on-chain");
        Ok(())
    }
}
