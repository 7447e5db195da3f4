use crate::error::ServiceError;
use crate::parser::community::{Census, Community, TriState};

/// Checks a community before it is persisted or written on-chain.
///
/// Checks run in order: chain id, name, census detail for the declared census
/// type, admins. A record that passes gets its unset flags defaulted:
/// `notifications` becomes `False` and `disabled` becomes `True`.
pub fn validate(community: &mut Community) -> Result<(), ServiceError> {
    if community.chain_id == 0 {
        return Err(ServiceError::invalid("chain ID is required"));
    }
    if community.name.is_empty() {
        return Err(ServiceError::invalid("name is required"));
    }
    match &community.census {
        Census::Channel(channel) | Census::Followers(channel) => {
            if channel.is_empty() {
                return Err(ServiceError::invalid(format!(
                    "census channel is required for {} census",
                    community.census.census_type()
                )));
            }
        }
        Census::Erc20(addresses) | Census::Nft(addresses) => {
            if addresses.is_empty() {
                return Err(ServiceError::invalid(format!(
                    "census addresses are required for {} census",
                    community.census.census_type()
                )));
            }
        }
    }
    if community.admins.is_empty() {
        return Err(ServiceError::invalid("admins are required"));
    }

    if !community.notifications.is_set() {
        community.notifications = TriState::False;
    }
    // unset disabled reads as disabled
    if !community.disabled.is_set() {
        community.disabled = TriState::True;
    }
    Ok(())
}
