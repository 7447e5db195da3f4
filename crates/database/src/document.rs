use alloy::primitives::Address;
use hub_service::community_id;
use hub_service::{Census, CensusType, ChainRegistry, Community, ContractAddress, TriState};
use serde::{Deserialize, Serialize};

use crate::error::DbError;

/// Persisted shape of a community.
///
/// The census is stored flat: a string tag plus the detail of the active
/// variant, the other detail left empty. The chain ID is not stored, it is
/// derived from the alias in the ID when the document is loaded. On-chain only
/// fields (funds, election permission) never reach the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityDocument {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub group_chat_url: String,
    #[serde(default)]
    pub channels: Vec<String>,
    pub census_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub census_channel: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub census_addresses: Vec<AddressDocument>,
    pub admins: Vec<u64>,
    #[serde(default)]
    pub notifications: Option<bool>,
    #[serde(default)]
    pub disabled: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressDocument {
    pub blockchain: String,
    pub address: String,    // 0x-prefixed hex
}

impl From<&Community> for CommunityDocument {
    fn from(community: &Community) -> Self {
        let census_addresses = community
            .census
            .addresses()
            .iter()
            .map(|token| AddressDocument {
                blockchain: token.blockchain.clone(),
                address: token.address.to_string(),
            })
            .collect();

        Self {
            id: community.community_id.clone(),
            name: community.name.clone(),
            image_url: community.image_url.clone(),
            group_chat_url: community.group_chat_url.clone(),
            channels: community.channels.clone(),
            census_type: community.census.census_type().as_str().to_string(),
            census_channel: community.census.channel().unwrap_or_default().to_string(),
            census_addresses,
            admins: community.admins.clone(),
            notifications: community.notifications.as_option(),
            disabled: community.disabled.as_option(),
        }
    }
}

impl CommunityDocument {
    /// Converts back into the domain shape. The ID must resolve against the
    /// registry and the census tag must be known.
    pub fn into_community(self, registry: &ChainRegistry) -> Result<Community, DbError> {
        let resolved = community_id::resolve(registry, &self.id)?;
        let census_type: CensusType = self.census_type.parse()?;

        let census = match census_type {
            CensusType::Channel => Census::Channel(self.census_channel),
            CensusType::Followers => Census::Followers(self.census_channel),
            CensusType::Erc20 => Census::Erc20(parse_addresses(&self.id, self.census_addresses)?),
            CensusType::Nft => Census::Nft(parse_addresses(&self.id, self.census_addresses)?),
        };

        Ok(Community {
            community_id: self.id,
            chain_id: resolved.chain_id,
            name: self.name,
            image_url: self.image_url,
            group_chat_url: self.group_chat_url,
            channels: self.channels,
            census,
            admins: self.admins,
            notifications: TriState::from(self.notifications),
            disabled: TriState::from(self.disabled),
            ..Default::default()
        })
    }
}

fn parse_addresses(key: &str, addresses: Vec<AddressDocument>) -> Result<Vec<ContractAddress>, DbError> {
    addresses
        .into_iter()
        .map(|entry| {
            let address = entry.address.parse::<Address>().map_err(|e| DbError::Corrupted {
                key: key.to_string(),
                reason: format!("invalid census address {}: {e}", entry.address),
            })?;
            Ok(ContractAddress {
                blockchain: entry.blockchain,
                address,
            })
        })
        .collect()
}
