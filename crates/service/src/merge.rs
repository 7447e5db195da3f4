use crate::error::ServiceError;
use crate::parser::community::Community;
use crate::validate::validate;

/// Combines the persisted record with a freshly read one.
///
/// Without an existing record the incoming one is validated and returned as
/// is. Otherwise the existing record is re-validated and the incoming fields
/// are applied on top of a copy of it:
///
/// - `name`, `image_url` and the census are taken only when the incoming value
///   is non-empty and differs. The census variant carries its own detail, so a
///   type change never mixes in detail from the other variant.
/// - `group_chat_url` and `channels` are always taken.
/// - a non-empty incoming admin list replaces the existing one only if it keeps
///   the same creator at index 0.
/// - `notifications` and `disabled` are taken only when set.
/// - `create_election_permission` and `funds` are always taken. The store
///   does not keep them, so the existing record never has current values.
///
/// On error nothing from `incoming` is visible to the caller.
pub fn merge(existing: Option<&Community>, incoming: &Community) -> Result<Community, ServiceError> {
    let Some(existing) = existing else {
        let mut community = incoming.clone();
        validate(&mut community)?;
        return Ok(community);
    };

    let mut merged = existing.clone();
    validate(&mut merged)?;

    if merged.community_id != incoming.community_id {
        return Err(ServiceError::CommunityIdMismatch {
            existing: merged.community_id,
            incoming: incoming.community_id.clone(),
        });
    }

    if let Some(&creator) = incoming.admins.first() {
        if merged.creator() != Some(creator) {
            return Err(ServiceError::NoAdminCreator {
                expected: merged.creator(),
                got: creator,
            });
        }
    }

    if !incoming.name.is_empty() && incoming.name != merged.name {
        merged.name = incoming.name.clone();
    }
    if !incoming.image_url.is_empty() && incoming.image_url != merged.image_url {
        merged.image_url = incoming.image_url.clone();
    }
    if !incoming.census.is_empty() && incoming.census != merged.census {
        merged.census = incoming.census.clone();
    }

    merged.group_chat_url = incoming.group_chat_url.clone();
    merged.channels = incoming.channels.clone();

    if !incoming.admins.is_empty() {
        merged.admins = incoming.admins.clone();
    }
    if incoming.notifications.is_set() {
        merged.notifications = incoming.notifications;
    }
    if incoming.disabled.is_set() {
        merged.disabled = incoming.disabled;
    }

    merged.create_election_permission = incoming.create_election_permission;
    merged.funds = incoming.funds;

    Ok(merged)
}
