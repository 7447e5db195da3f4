//! HTTP JSON-RPC binding for the community hub contract on EVM chains.

use std::sync::Arc;

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;

use crate::binding::{
    BindingError, Connector, HubBinding, RawCensus, RawCommunity, RawMetadata, RawResults, RawToken, TxOpts,
};

sol! {
    #[sol(rpc)]
    interface ICommunityHub {
        struct Token {
            string blockchain;
            address contractAddress;
        }

        struct CensusData {
            uint8 censusType;
            Token[] tokens;
            string channel;
        }

        struct CommunityMetadata {
            string name;
            string imageURI;
            string groupChatURL;
            string[] channels;
            bool notifications;
        }

        struct CommunityData {
            CommunityMetadata metadata;
            CensusData census;
            uint256[] guardians;
            uint8 createElectionPermission;
            bool disabled;
            uint256 funds;
        }

        struct ElectionResult {
            string question;
            string[] options;
            string date;
            uint256[][] tally;
            uint256 turnout;
            uint256 totalVotingPower;
            uint256[] participants;
            bytes censusRoot;
            string censusURI;
        }

        function getNextCommunityId() external view returns (uint256);
        function getCommunity(uint256 communityId) external view returns (CommunityData memory);
        function setCommunity(uint256 communityId, CommunityData calldata community) external;
        function getResult(uint256 communityId, bytes32 electionId) external view returns (ElectionResult memory);
        function setResult(uint256 communityId, bytes32 electionId, ElectionResult calldata result) external;
    }
}

/// Connects over HTTP. A signer, when given, is attached as the provider
/// wallet so writes are signed locally.
#[derive(Clone, Copy, Debug, Default)]
pub struct EvmConnector;

impl Connector for EvmConnector {
    type Client = DynProvider;

    fn client(&self, endpoint: &str, signer: Option<&PrivateKeySigner>) -> Result<DynProvider, BindingError> {
        let url: Url = endpoint
            .parse()
            .map_err(|e| BindingError::new(format!("invalid RPC endpoint {endpoint}: {e}")))?;

        let provider = match signer {
            Some(signer) => ProviderBuilder::new()
                .wallet(EthereumWallet::from(signer.clone()))
                .connect_http(url)
                .erased(),
            None => ProviderBuilder::new().connect_http(url).erased(),
        };
        Ok(provider)
    }

    fn bind(&self, client: DynProvider, address: Address) -> Result<Arc<dyn HubBinding>, BindingError> {
        if address.is_zero() {
            return Err(BindingError::new("contract address is zero"));
        }
        Ok(Arc::new(EvmHub {
            contract: ICommunityHub::new(address, client.clone()),
            provider: client,
        }))
    }
}

struct EvmHub {
    contract: ICommunityHub::ICommunityHubInstance<DynProvider>,
    provider: DynProvider,
}

fn rpc_error(e: impl std::fmt::Display) -> BindingError {
    BindingError::new(e.to_string())
}

#[async_trait]
impl HubBinding for EvmHub {
    async fn next_community_id(&self) -> Result<U256, BindingError> {
        self.contract.getNextCommunityId().call().await.map_err(rpc_error)
    }

    async fn community(&self, community_id: U256) -> Result<RawCommunity, BindingError> {
        let data = self.contract.getCommunity(community_id).call().await.map_err(rpc_error)?;
        Ok(data.into())
    }

    async fn set_community(
        &self,
        community_id: U256,
        community: RawCommunity,
        opts: TxOpts,
    ) -> Result<B256, BindingError> {
        let pending = self
            .contract
            .setCommunity(community_id, community.into())
            .from(opts.from)
            .nonce(opts.nonce)
            .gas(opts.gas_limit)
            .max_priority_fee_per_gas(opts.gas_tip_cap)
            .send()
            .await
            .map_err(rpc_error)?;
        Ok(*pending.tx_hash())
    }

    async fn result(&self, community_id: U256, election_id: B256) -> Result<RawResults, BindingError> {
        let result = self
            .contract
            .getResult(community_id, election_id)
            .call()
            .await
            .map_err(rpc_error)?;
        Ok(result.into())
    }

    async fn set_result(
        &self,
        community_id: U256,
        election_id: B256,
        results: RawResults,
        opts: TxOpts,
    ) -> Result<B256, BindingError> {
        let pending = self
            .contract
            .setResult(community_id, election_id, results.into())
            .from(opts.from)
            .nonce(opts.nonce)
            .gas(opts.gas_limit)
            .max_priority_fee_per_gas(opts.gas_tip_cap)
            .send()
            .await
            .map_err(rpc_error)?;
        Ok(*pending.tx_hash())
    }

    async fn pending_nonce(&self, account: Address) -> Result<u64, BindingError> {
        self.provider
            .get_transaction_count(account)
            .pending()
            .await
            .map_err(rpc_error)
    }

    async fn suggest_gas_tip(&self) -> Result<u128, BindingError> {
        self.provider.get_max_priority_fee_per_gas().await.map_err(rpc_error)
    }
}

impl From<ICommunityHub::CommunityData> for RawCommunity {
    fn from(data: ICommunityHub::CommunityData) -> Self {
        Self {
            metadata: RawMetadata {
                name: data.metadata.name,
                image_uri: data.metadata.imageURI,
                group_chat_url: data.metadata.groupChatURL,
                channels: data.metadata.channels,
                notifications: data.metadata.notifications,
            },
            census: RawCensus {
                census_type: data.census.censusType,
                tokens: data
                    .census
                    .tokens
                    .into_iter()
                    .map(|token| RawToken {
                        blockchain: token.blockchain,
                        contract_address: token.contractAddress,
                    })
                    .collect(),
                channel: data.census.channel,
            },
            guardians: data.guardians,
            create_election_permission: data.createElectionPermission,
            disabled: data.disabled,
            funds: data.funds,
        }
    }
}

impl From<RawCommunity> for ICommunityHub::CommunityData {
    fn from(raw: RawCommunity) -> Self {
        Self {
            metadata: ICommunityHub::CommunityMetadata {
                name: raw.metadata.name,
                imageURI: raw.metadata.image_uri,
                groupChatURL: raw.metadata.group_chat_url,
                channels: raw.metadata.channels,
                notifications: raw.metadata.notifications,
            },
            census: ICommunityHub::CensusData {
                censusType: raw.census.census_type,
                tokens: raw
                    .census
                    .tokens
                    .into_iter()
                    .map(|token| ICommunityHub::Token {
                        blockchain: token.blockchain,
                        contractAddress: token.contract_address,
                    })
                    .collect(),
                channel: raw.census.channel,
            },
            guardians: raw.guardians,
            createElectionPermission: raw.create_election_permission,
            disabled: raw.disabled,
            funds: raw.funds,
        }
    }
}

impl From<ICommunityHub::ElectionResult> for RawResults {
    fn from(result: ICommunityHub::ElectionResult) -> Self {
        Self {
            question: result.question,
            options: result.options,
            date: result.date,
            tally: result.tally,
            turnout: result.turnout,
            total_voting_power: result.totalVotingPower,
            participants: result.participants,
            census_root: result.censusRoot.to_vec(),
            census_uri: result.censusURI,
        }
    }
}

impl From<RawResults> for ICommunityHub::ElectionResult {
    fn from(raw: RawResults) -> Self {
        Self {
            question: raw.question,
            options: raw.options,
            date: raw.date,
            tally: raw.tally,
            turnout: raw.turnout,
            totalVotingPower: raw.total_voting_power,
            participants: raw.participants,
            censusRoot: raw.census_root.into(),
            censusURI: raw.census_uri,
        }
    }
}
