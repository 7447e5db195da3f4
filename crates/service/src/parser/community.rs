use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, B256, U256};

use crate::error::ServiceError;

/// Explicit three-valued flag. `Unknown` means the value was never observed,
/// which is different from an explicit `False`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TriState {
    #[default]
    Unknown,
    True,
    False,
}

impl TriState {
    pub fn is_set(&self) -> bool {
        !matches!(self, TriState::Unknown)
    }

    pub fn as_option(&self) -> Option<bool> {
        match self {
            TriState::Unknown => None,
            TriState::True => Some(true),
            TriState::False => Some(false),
        }
    }
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        if value {
            TriState::True
        } else {
            TriState::False
        }
    }
}

impl From<Option<bool>> for TriState {
    fn from(value: Option<bool>) -> Self {
        value.map(TriState::from).unwrap_or_default()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CensusType {
    Channel,
    Erc20,
    Nft,
    Followers,
}

impl CensusType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CensusType::Channel => "channel",
            CensusType::Erc20 => "erc20",
            CensusType::Nft => "nft",
            CensusType::Followers => "followers",
        }
    }
}

impl fmt::Display for CensusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CensusType {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "channel" => Ok(CensusType::Channel),
            "erc20" => Ok(CensusType::Erc20),
            "nft" => Ok(CensusType::Nft),
            "followers" => Ok(CensusType::Followers),
            other => Err(ServiceError::UnknownCensusType(other.to_string())),
        }
    }
}

/// Token contract backing an ERC20 or NFT census.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractAddress {
    pub blockchain: String,
    pub address: Address,
}

/// Census source of a community. Only the detail of the active variant exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Census {
    Channel(String),
    Followers(String),
    Erc20(Vec<ContractAddress>),
    Nft(Vec<ContractAddress>),
}

impl Census {
    pub fn census_type(&self) -> CensusType {
        match self {
            Census::Channel(_) => CensusType::Channel,
            Census::Followers(_) => CensusType::Followers,
            Census::Erc20(_) => CensusType::Erc20,
            Census::Nft(_) => CensusType::Nft,
        }
    }

    /// True when the variant carries no usable detail.
    pub fn is_empty(&self) -> bool {
        match self {
            Census::Channel(channel) | Census::Followers(channel) => channel.is_empty(),
            Census::Erc20(addresses) | Census::Nft(addresses) => addresses.is_empty(),
        }
    }

    pub fn channel(&self) -> Option<&str> {
        match self {
            Census::Channel(channel) | Census::Followers(channel) => Some(channel),
            _ => None,
        }
    }

    pub fn addresses(&self) -> &[ContractAddress] {
        match self {
            Census::Erc20(addresses) | Census::Nft(addresses) => addresses,
            _ => &[],
        }
    }
}

impl Default for Census {
    fn default() -> Self {
        Census::Channel(String::new())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Community {
    pub community_id: String,           // "<chain alias>:<contract local id>"
    pub chain_id: u64,                  // derived from the alias, never authoritative
    pub name: String,
    pub image_url: String,
    pub group_chat_url: String,
    pub channels: Vec<String>,
    pub census: Census,
    pub admins: Vec<u64>,               // admins[0] is the creator
    pub notifications: TriState,
    pub disabled: TriState,
    pub create_election_permission: u8, // on-chain only
    pub funds: U256,                    // on-chain only
}

impl Community {
    pub fn creator(&self) -> Option<u64> {
        self.admins.first().copied()
    }
}

/// Final tally of one election run by a community.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HubResults {
    pub community_id: String,
    pub election_id: B256,
    pub question: String,
    pub options: Vec<String>,
    pub date: String,
    pub tally: Vec<Vec<U256>>,
    pub turnout: U256,
    pub total_voting_power: U256,
    pub participants: Vec<u64>,
    pub census_root: Vec<u8>,
    pub census_uri: String,
}
