//! In-memory stand-ins for a contract and the store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use alloy::primitives::B256;
use async_trait::async_trait;
use hub_chain::{BindingError, ChainError, CommunityContract};
use hub_database::{CommunityStore, DbError};
use hub_service::{Census, ChainRegistry, Community, HubResults};

/// Valid record with unset flags on the registry chain named by the ID prefix.
pub fn community(id: &str, name: &str, admins: &[u64]) -> Community {
    let registry = ChainRegistry::new([("eth", 1), ("base", 8453)]);
    let alias = id.split(':').next().unwrap_or_default();
    Community {
        community_id: id.to_string(),
        chain_id: registry.chain_id_from_alias(alias).unwrap_or(1),
        name: name.to_string(),
        census: Census::Channel("builders".to_string()),
        admins: admins.to_vec(),
        ..Default::default()
    }
}

pub struct FakeContract {
    alias: String,
    chain_id: u64,
    next: AtomicU64,
    slots: Mutex<HashMap<u64, Community>>,
    written: Mutex<Vec<Community>>,
    fail_writes: AtomicBool,
    fail_next_reads: AtomicBool,
    fail_community_reads: AtomicBool,
    rpc_calls: AtomicUsize,
}

impl FakeContract {
    pub fn new(alias: &str, chain_id: u64) -> Self {
        Self {
            alias: alias.to_string(),
            chain_id,
            next: AtomicU64::new(1),
            slots: Mutex::new(HashMap::new()),
            written: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
            fail_next_reads: AtomicBool::new(false),
            fail_community_reads: AtomicBool::new(false),
            rpc_calls: AtomicUsize::new(0),
        }
    }

    pub fn put(&self, local_id: u64, community: Community) {
        self.slots.lock().unwrap().insert(local_id, community);
    }

    pub fn set_next(&self, next: u64) {
        self.next.store(next, Ordering::SeqCst);
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    /// Every read fails as if the RPC endpoint were down.
    pub fn fail_reads(&self) {
        self.fail_next_reads.store(true, Ordering::SeqCst);
        self.fail_community_reads.store(true, Ordering::SeqCst);
    }

    /// Only community reads fail, the next ID still answers.
    pub fn fail_community_reads(&self) {
        self.fail_community_reads.store(true, Ordering::SeqCst);
    }

    fn check_read(flag: &AtomicBool) -> Result<(), ChainError> {
        if flag.load(Ordering::SeqCst) {
            return Err(BindingError::new("connection refused").into());
        }
        Ok(())
    }

    pub fn written(&self) -> Vec<Community> {
        self.written.lock().unwrap().clone()
    }

    pub fn rpc_calls(&self) -> usize {
        self.rpc_calls.load(Ordering::SeqCst)
    }

    fn local_id(&self, community_id: &str) -> Result<u64, ChainError> {
        match community_id.split_once(':') {
            Some((alias, local)) if alias == self.alias => local
                .parse()
                .map_err(|_| ChainError::NotFound(format!("community {community_id}"))),
            Some((alias, _)) => Err(ChainError::ChainMismatch {
                community_id: community_id.to_string(),
                expected: self.alias.clone(),
                got: alias.to_string(),
            }),
            None => Err(ChainError::NotFound(format!("community {community_id}"))),
        }
    }
}

#[async_trait]
impl CommunityContract for FakeContract {
    fn chain_alias(&self) -> &str {
        &self.alias
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn next_contract_id(&self) -> Result<u64, ChainError> {
        self.rpc_calls.fetch_add(1, Ordering::SeqCst);
        Self::check_read(&self.fail_next_reads)?;
        Ok(self.next.load(Ordering::SeqCst))
    }

    async fn community(&self, community_id: &str) -> Result<Community, ChainError> {
        self.rpc_calls.fetch_add(1, Ordering::SeqCst);
        Self::check_read(&self.fail_community_reads)?;
        let local_id = self.local_id(community_id)?;
        self.slots
            .lock()
            .unwrap()
            .get(&local_id)
            .cloned()
            .ok_or_else(|| ChainError::NotFound(format!("community {community_id}")))
    }

    async fn set_community(&self, community: &Community) -> Result<(), ChainError> {
        self.rpc_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ChainError::SendTransaction("execution reverted".to_string()));
        }
        let local_id = self.local_id(&community.community_id)?;
        self.slots.lock().unwrap().insert(local_id, community.clone());
        self.written.lock().unwrap().push(community.clone());
        Ok(())
    }

    async fn results(&self, local_id: u64, _election_id: B256) -> Result<HubResults, ChainError> {
        self.rpc_calls.fetch_add(1, Ordering::SeqCst);
        Err(ChainError::NotFound(format!("results for community {local_id}")))
    }

    async fn set_results(&self, _local_id: u64, _election_id: B256, _results: &HubResults) -> Result<(), ChainError> {
        self.rpc_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Community>>,
    writes: Mutex<Vec<String>>,
    raced: Mutex<Option<Community>>,
    closed: AtomicBool,
}

impl MemoryStore {
    /// Seeds a record without counting it as a write.
    pub fn insert(&self, community: Community) {
        self.records
            .lock()
            .unwrap()
            .insert(community.community_id.clone(), community);
    }

    pub fn get(&self, community_id: &str) -> Option<Community> {
        self.records.lock().unwrap().get(community_id).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// IDs passed to add or update, in call order.
    pub fn written_ids(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    /// The next add finds `community` already stored, as if another writer
    /// got there between the lookup and the insert.
    pub fn race_on_next_add(&self, community: Community) {
        *self.raced.lock().unwrap() = Some(community);
    }

    fn check_open(&self) -> Result<(), DbError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DbError::Closed);
        }
        Ok(())
    }
}

impl CommunityStore for MemoryStore {
    fn community(&self, community_id: &str) -> Result<Option<Community>, DbError> {
        self.check_open()?;
        Ok(self.get(community_id))
    }

    fn add_community(&self, community: &Community) -> Result<(), DbError> {
        self.check_open()?;
        if let Some(raced) = self.raced.lock().unwrap().take() {
            self.insert(raced);
        }
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&community.community_id) {
            return Err(DbError::AlreadyExists(community.community_id.clone()));
        }
        records.insert(community.community_id.clone(), community.clone());
        self.writes.lock().unwrap().push(community.community_id.clone());
        Ok(())
    }

    fn update_community(&self, community: &Community) -> Result<(), DbError> {
        self.check_open()?;
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&community.community_id) {
            Some(existing) => *existing = community.clone(),
            None => return Err(DbError::NotFound(community.community_id.clone())),
        }
        self.writes.lock().unwrap().push(community.community_id.clone());
        Ok(())
    }
}
