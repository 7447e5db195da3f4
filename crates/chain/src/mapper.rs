//! Pure conversions between the contract tuples and the domain types.

use alloy::primitives::{B256, U256};
use hub_service::{Census, CensusType, Community, ContractAddress, HubResults, TriState};

use crate::binding::{RawCensus, RawCommunity, RawMetadata, RawResults, RawToken};
use crate::error::ChainError;

/// Contract enum value for each census type. Anything outside this table is
/// rejected, never defaulted.
const CENSUS_TYPES: [(u8, CensusType); 4] = [
    (0, CensusType::Channel),
    (1, CensusType::Followers),
    (2, CensusType::Erc20),
    (3, CensusType::Nft),
];

pub fn census_type_from_tag(tag: u8) -> Result<CensusType, ChainError> {
    CENSUS_TYPES
        .iter()
        .find(|(t, _)| *t == tag)
        .map(|(_, census_type)| *census_type)
        .ok_or(ChainError::UnknownCensusType(tag))
}

pub fn census_type_to_tag(census_type: CensusType) -> u8 {
    CENSUS_TYPES
        .iter()
        .find(|(_, c)| *c == census_type)
        .map(|(tag, _)| *tag)
        .unwrap_or_default()
}

fn to_u64(value: U256, what: &str) -> Result<u64, ChainError> {
    u64::try_from(value).map_err(|_| ChainError::InvalidOnchainData(format!("{what} {value} does not fit in u64")))
}

pub fn community_from_raw(community_id: &str, chain_id: u64, raw: RawCommunity) -> Result<Community, ChainError> {
    let census = match census_type_from_tag(raw.census.census_type)? {
        CensusType::Channel => Census::Channel(raw.census.channel),
        CensusType::Followers => Census::Followers(raw.census.channel),
        CensusType::Erc20 => Census::Erc20(tokens_from_raw(raw.census.tokens)),
        CensusType::Nft => Census::Nft(tokens_from_raw(raw.census.tokens)),
    };

    let admins = raw
        .guardians
        .into_iter()
        .map(|guardian| to_u64(guardian, "guardian"))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Community {
        community_id: community_id.to_string(),
        chain_id,
        name: raw.metadata.name,
        image_url: raw.metadata.image_uri,
        group_chat_url: raw.metadata.group_chat_url,
        channels: raw.metadata.channels,
        census,
        admins,
        notifications: TriState::from(raw.metadata.notifications),
        disabled: TriState::from(raw.disabled),
        create_election_permission: raw.create_election_permission,
        funds: raw.funds,
    })
}

fn tokens_from_raw(tokens: Vec<RawToken>) -> Vec<ContractAddress> {
    tokens
        .into_iter()
        .map(|token| ContractAddress {
            blockchain: token.blockchain,
            address: token.contract_address,
        })
        .collect()
}

/// Unset flags are written as `false`; the contract has no third state.
pub fn community_to_raw(community: &Community) -> RawCommunity {
    let tokens = community
        .census
        .addresses()
        .iter()
        .map(|token| RawToken {
            blockchain: token.blockchain.clone(),
            contract_address: token.address,
        })
        .collect();

    RawCommunity {
        metadata: RawMetadata {
            name: community.name.clone(),
            image_uri: community.image_url.clone(),
            group_chat_url: community.group_chat_url.clone(),
            channels: community.channels.clone(),
            notifications: community.notifications.as_option().unwrap_or(false),
        },
        census: RawCensus {
            census_type: census_type_to_tag(community.census.census_type()),
            tokens,
            channel: community.census.channel().unwrap_or_default().to_string(),
        },
        guardians: community.admins.iter().map(|admin| U256::from(*admin)).collect(),
        create_election_permission: community.create_election_permission,
        disabled: community.disabled.as_option().unwrap_or(false),
        funds: community.funds,
    }
}

pub fn results_from_raw(community_id: &str, election_id: B256, raw: RawResults) -> Result<HubResults, ChainError> {
    let participants = raw
        .participants
        .into_iter()
        .map(|participant| to_u64(participant, "participant"))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(HubResults {
        community_id: community_id.to_string(),
        election_id,
        question: raw.question,
        options: raw.options,
        date: raw.date,
        tally: raw.tally,
        turnout: raw.turnout,
        total_voting_power: raw.total_voting_power,
        participants,
        census_root: raw.census_root,
        census_uri: raw.census_uri,
    })
}

pub fn results_to_raw(results: &HubResults) -> RawResults {
    RawResults {
        question: results.question.clone(),
        options: results.options.clone(),
        date: results.date.clone(),
        tally: results.tally.clone(),
        turnout: results.turnout,
        total_voting_power: results.total_voting_power,
        participants: results.participants.iter().map(|p| U256::from(*p)).collect(),
        census_root: results.census_root.clone(),
        census_uri: results.census_uri.clone(),
    }
}
