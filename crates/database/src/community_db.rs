use hub_service::{ChainRegistry, Community};
use tracing::debug;

use crate::basic_db::{InnerDatabase, SafeDatabase};
use crate::document::CommunityDocument;
use crate::error::DbError;

pub const COMMUNITY_TABLE: &str = "communities";

/// Document store for communities.
///
/// Implementations are shared by the sync loops and request handlers without
/// any extra locking, so they must be safe for concurrent use.
pub trait CommunityStore: Send + Sync {
    /// `Ok(None)` on a miss. A miss is not an error.
    fn community(&self, community_id: &str) -> Result<Option<Community>, DbError>;

    /// Fails with [`DbError::AlreadyExists`] when the ID is taken.
    fn add_community(&self, community: &Community) -> Result<(), DbError>;

    /// Fails with [`DbError::NotFound`] when the ID is unknown.
    fn update_community(&self, community: &Community) -> Result<(), DbError>;
}

/// [`CommunityStore`] over a [`SafeDatabase`], one JSON document per community.
#[derive(Clone)]
pub struct CommunityDb<D = InnerDatabase> {
    db: D,
    registry: ChainRegistry,
}

impl<D: SafeDatabase> CommunityDb<D> {
    pub fn new(db: D, registry: ChainRegistry) -> Self {
        Self { db, registry }
    }

    /// Every stored community, in no particular order.
    pub fn communities(&self) -> Result<Vec<Community>, DbError> {
        let entries = self.db.read_all(COMMUNITY_TABLE)?;

        let mut communities = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let key = String::from_utf8_lossy(&key).into_owned();
            communities.push(self.decode(&key, &value)?);
        }
        Ok(communities)
    }

    pub fn close(&self) {
        self.db.close();
    }

    fn decode(&self, key: &str, value: &[u8]) -> Result<Community, DbError> {
        let document: CommunityDocument = serde_json::from_slice(value)?;
        if document.id != key {
            return Err(DbError::Corrupted {
                key: key.to_string(),
                reason: format!("document carries ID {}", document.id),
            });
        }
        document.into_community(&self.registry)
    }

    fn encode(community: &Community) -> Result<Vec<u8>, DbError> {
        Ok(serde_json::to_vec(&CommunityDocument::from(community))?)
    }
}

impl<D: SafeDatabase> CommunityStore for CommunityDb<D> {
    fn community(&self, community_id: &str) -> Result<Option<Community>, DbError> {
        match self.db.read(community_id, COMMUNITY_TABLE)? {
            Some(value) => Ok(Some(self.decode(community_id, &value)?)),
            None => Ok(None),
        }
    }

    fn add_community(&self, community: &Community) -> Result<(), DbError> {
        let value = Self::encode(community)?;
        self.db.insert(&community.community_id, &value, COMMUNITY_TABLE)?;
        debug!(community_id = %community.community_id, "community stored");
        Ok(())
    }

    fn update_community(&self, community: &Community) -> Result<(), DbError> {
        // existence check and write are not atomic; the sync loops never
        // delete, so a record seen here is still there at write time
        if self.db.read(&community.community_id, COMMUNITY_TABLE)?.is_none() {
            return Err(DbError::NotFound(community.community_id.clone()));
        }
        let value = Self::encode(community)?;
        self.db.write(&community.community_id, &value, COMMUNITY_TABLE)?;
        debug!(community_id = %community.community_id, "community updated");
        Ok(())
    }
}
