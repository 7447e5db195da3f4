//! Community identifiers of the form `"<chain alias>:<contract local id>"`.
//!
//! The alias is the only integrity check the format carries, so every
//! identifier coming from the chain, the store or a caller goes through
//! [`resolve`] before it is trusted.

use crate::chains::ChainRegistry;
use crate::error::ServiceError;

pub const SEPARATOR: char = ':';

pub fn encode(chain_alias: &str, local_id: u64) -> String {
    format!("{chain_alias}{SEPARATOR}{local_id}")
}

/// Splits on the first separator. Fails when there is none or the alias
/// part is empty.
pub fn decode(community_id: &str) -> Option<(&str, &str)> {
    let (alias, local_id) = community_id.split_once(SEPARATOR)?;
    if alias.is_empty() {
        return None;
    }
    Some((alias, local_id))
}

/// A community ID checked against the chain registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedId {
    pub chain_alias: String,
    pub chain_id: u64,
    pub local_id: u64,
}

/// Only the canonical form produced by [`encode`] resolves: `eth:05` or
/// `eth:+5` would name the same slot as `eth:5` under a different store key.
pub fn resolve(registry: &ChainRegistry, community_id: &str) -> Result<ResolvedId, ServiceError> {
    let malformed = || ServiceError::MalformedCommunityId(community_id.to_string());
    let (alias, local_id) = decode(community_id).ok_or_else(malformed)?;
    let local_id = local_id.parse::<u64>().map_err(|_| malformed())?;
    if encode(alias, local_id) != community_id {
        return Err(malformed());
    }
    let chain_id = registry
        .chain_id_from_alias(alias)
        .ok_or_else(|| ServiceError::UnknownChainAlias(alias.to_string()))?;

    Ok(ResolvedId {
        chain_alias: alias.to_string(),
        chain_id,
        local_id,
    })
}
