//! Sync engine: keeps the community store converging towards on-chain state.
//!
//! Two loops run side by side over every configured contract:
//! - discovery reads the slot at the contract's next ID and stores whatever
//!   appeared there;
//! - reconciliation walks every assigned ID in increasing order, merges the
//!   on-chain record into the stored one and writes the result back.
//!
//! The loops are not mutually excluded. Both persist through the same
//! insert-or-merge path, and a duplicate insert falls back to the merge, which
//! is idempotent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hub_chain::{ChainError, CommunityContract};
use hub_database::{CommunityStore, DbError};
use hub_service::{community_id, merge, ChainRegistry, Community};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::SyncError;

pub const DEFAULT_DISCOVER_COOLDOWN: Duration = Duration::from_secs(20);
pub const DEFAULT_SYNC_COOLDOWN: Duration = Duration::from_secs(40);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    pub discover_cooldown: Duration,
    pub sync_cooldown: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            discover_cooldown: DEFAULT_DISCOVER_COOLDOWN,
            sync_cooldown: DEFAULT_SYNC_COOLDOWN,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Stopped,
    Running,
}

/// How a record reached the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Persisted {
    Inserted,
    Merged,
}

pub(crate) struct Inner {
    pub(crate) registry: ChainRegistry,
    /// Built once, read-only afterwards.
    pub(crate) contracts: HashMap<String, Arc<dyn CommunityContract>>,
    pub(crate) store: Arc<dyn CommunityStore>,
    pub(crate) config: SyncConfig,
}

pub struct SyncEngine {
    inner: Arc<Inner>,
    shutdown_tx: watch::Sender<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    state: Mutex<EngineState>,
}

impl SyncEngine {
    /// Checks the configuration and builds a stopped engine. Every contract
    /// must sit on a registered chain with a matching chain ID.
    pub fn new(
        registry: ChainRegistry,
        contracts: Vec<Arc<dyn CommunityContract>>,
        store: Arc<dyn CommunityStore>,
        config: SyncConfig,
    ) -> Result<Self, SyncError> {
        if registry.is_empty() {
            return Err(SyncError::Config("no chain aliases configured".to_string()));
        }
        if contracts.is_empty() {
            return Err(SyncError::Config("no contracts configured".to_string()));
        }

        let mut by_alias = HashMap::with_capacity(contracts.len());
        for contract in contracts {
            let alias = contract.chain_alias().to_string();
            match registry.chain_id_from_alias(&alias) {
                Some(chain_id) if chain_id == contract.chain_id() => {}
                Some(chain_id) => {
                    return Err(SyncError::Config(format!(
                        "contract for {alias} reports chain ID {}, registry says {chain_id}",
                        contract.chain_id()
                    )))
                }
                None => return Err(SyncError::Config(format!("contract configured for unknown chain {alias}"))),
            }
            if by_alias.insert(alias.clone(), contract).is_some() {
                return Err(SyncError::Config(format!("more than one contract configured for {alias}")));
            }
        }

        let (shutdown_tx, _) = watch::channel(false);
        Ok(Self {
            inner: Arc::new(Inner {
                registry,
                contracts: by_alias,
                store,
                config,
            }),
            shutdown_tx,
            handles: Mutex::new(Vec::new()),
            state: Mutex::new(EngineState::Stopped),
        })
    }

    pub fn state(&self) -> EngineState {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Spawns the discovery and reconciliation loops. An engine runs once:
    /// after [`stop`](Self::stop) a new engine is needed.
    pub fn start(&self) -> Result<(), SyncError> {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *state == EngineState::Running || *self.shutdown_tx.borrow() {
            return Err(SyncError::AlreadyStarted);
        }

        let discovery = tokio::spawn(discovery_loop(self.inner.clone(), self.shutdown_tx.subscribe()));
        let reconciliation = tokio::spawn(reconciliation_loop(self.inner.clone(), self.shutdown_tx.subscribe()));
        self.handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend([discovery, reconciliation]);

        *state = EngineState::Running;
        info!(
            contracts = self.inner.contracts.len(),
            discover_cooldown = ?self.inner.config.discover_cooldown,
            sync_cooldown = ?self.inner.config.sync_cooldown,
            "sync engine started"
        );
        Ok(())
    }

    /// Cancels both loops and waits until they returned.
    pub async fn stop(&self) {
        self.shutdown_tx.send_replace(true);
        let handles = std::mem::take(&mut *self.handles.lock().unwrap_or_else(|poisoned| poisoned.into_inner()));
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "sync loop panicked");
            }
        }
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = EngineState::Stopped;
        info!("sync engine stopped");
    }

    /// Contract owning `community_id`. Fails without any RPC when the ID does
    /// not resolve or no contract is configured for its chain.
    pub fn contract_for(&self, community_id: &str) -> Result<Arc<dyn CommunityContract>, SyncError> {
        self.inner.contract_for(community_id)
    }

    pub fn contract(&self, chain_alias: &str) -> Option<Arc<dyn CommunityContract>> {
        self.inner.contracts.get(chain_alias).cloned()
    }

    /// Reads a community straight from its contract.
    pub async fn onchain_community(&self, community_id: &str) -> Result<Community, SyncError> {
        let contract = self.contract_for(community_id)?;
        Ok(contract.community(community_id).await?)
    }

    /// Applies caller changes: merge with the stored record, write the result
    /// on-chain, then persist it. The store is only touched after the chain
    /// write succeeded.
    ///
    /// The election permission comes from `new_data`. Funds are owned by the
    /// contract and are re-read from it.
    pub async fn update_community(&self, new_data: &Community) -> Result<Community, SyncError> {
        let contract = self.contract_for(&new_data.community_id)?;
        let existing = self.inner.store.community(&new_data.community_id)?;
        let mut merged = merge(existing.as_ref(), new_data)?;

        match contract.community(&merged.community_id).await {
            Ok(onchain) => merged.funds = onchain.funds,
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        contract.set_community(&merged).await?;

        if existing.is_some() {
            self.inner.store.update_community(&merged)?;
        } else {
            self.inner.store.add_community(&merged)?;
        }
        info!(community_id = %merged.community_id, "community updated");
        Ok(merged)
    }
}

impl Inner {
    pub(crate) fn contract_for(&self, community_id: &str) -> Result<Arc<dyn CommunityContract>, SyncError> {
        let resolved = community_id::resolve(&self.registry, community_id)?;
        self.contracts
            .get(&resolved.chain_alias)
            .cloned()
            .ok_or_else(|| ChainError::NoContract(resolved.chain_alias).into())
    }

    /// Inserts `onchain` when the store has no record for it, otherwise merges
    /// it into the stored one.
    pub(crate) fn persist(&self, onchain: &Community) -> Result<Persisted, SyncError> {
        let id = &onchain.community_id;
        if let Some(existing) = self.store.community(id)? {
            return self.merge_into_store(&existing, onchain);
        }

        let community = merge(None, onchain)?;
        match self.store.add_community(&community) {
            Ok(()) => Ok(Persisted::Inserted),
            Err(DbError::AlreadyExists(_)) => {
                // the other loop stored it first
                let existing = self.store.community(id)?.ok_or_else(|| DbError::NotFound(id.clone()))?;
                self.merge_into_store(&existing, onchain)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn merge_into_store(&self, existing: &Community, onchain: &Community) -> Result<Persisted, SyncError> {
        let merged = merge(Some(existing), onchain)?;
        self.store.update_community(&merged)?;
        Ok(Persisted::Merged)
    }

    /// One pass of the discovery loop. Only a closed store is returned as an
    /// error; everything else is logged.
    pub(crate) async fn discover(&self, shutdown: &watch::Receiver<bool>) -> Result<(), SyncError> {
        for (alias, contract) in &self.contracts {
            if *shutdown.borrow() {
                return Ok(());
            }

            let next = match contract.next_contract_id().await {
                Ok(next) => next,
                Err(e) => {
                    warn!(chain = %alias, error = %e, "failed to read next community ID");
                    continue;
                }
            };
            let id = community_id::encode(alias, next);
            let community = match contract.community(&id).await {
                Ok(community) => community,
                Err(e) if e.is_not_found() => continue,
                Err(e) => {
                    warn!(community_id = %id, error = %e, "failed to read community");
                    continue;
                }
            };

            match self.persist(&community) {
                Ok(Persisted::Inserted) => info!(community_id = %id, "new community discovered"),
                Ok(Persisted::Merged) => debug!(community_id = %id, "discovered community was already stored"),
                Err(e) if e.is_store_closed() => return Err(e),
                Err(e) => warn!(community_id = %id, error = %e, "failed to store discovered community"),
            }
        }
        Ok(())
    }

    /// One pass of the reconciliation loop. A closed store aborts the whole
    /// pass, any other per-community error is logged and skipped.
    pub(crate) async fn reconcile(&self, shutdown: &watch::Receiver<bool>) -> Result<(), SyncError> {
        for (alias, contract) in &self.contracts {
            if *shutdown.borrow() {
                return Ok(());
            }

            let next = match contract.next_contract_id().await {
                Ok(next) => next,
                Err(e) => {
                    warn!(chain = %alias, error = %e, "failed to read next community ID");
                    continue;
                }
            };

            let (mut reconciled, mut inserted, mut failed) = (0usize, 0usize, 0usize);
            for local_id in 1..next {
                if *shutdown.borrow() {
                    return Ok(());
                }

                let id = community_id::encode(alias, local_id);
                let outcome = match contract.community(&id).await {
                    Ok(community) => self.persist(&community),
                    Err(e) => Err(e.into()),
                };
                match outcome {
                    Ok(Persisted::Merged) => reconciled += 1,
                    Ok(Persisted::Inserted) => {
                        inserted += 1;
                        info!(community_id = %id, "missing community inserted");
                    }
                    Err(e) if e.is_store_closed() => return Err(e),
                    Err(e) if e.is_not_found() => debug!(community_id = %id, "no community on-chain"),
                    Err(e) => {
                        failed += 1;
                        warn!(community_id = %id, error = %e, "failed to reconcile community");
                    }
                }
            }
            debug!(chain = %alias, reconciled, inserted, failed, "contract reconciled");
        }
        Ok(())
    }
}

async fn discovery_loop(inner: Arc<Inner>, mut shutdown: watch::Receiver<bool>) {
    debug!("discovery loop running");
    loop {
        if let Err(e) = inner.discover(&shutdown).await {
            error!(error = %e, "discovery loop stopped");
            return;
        }
        tokio::select! {
            _ = shutdown.changed() => return,
            _ = tokio::time::sleep(inner.config.discover_cooldown) => {}
        }
    }
}

async fn reconciliation_loop(inner: Arc<Inner>, mut shutdown: watch::Receiver<bool>) {
    debug!("reconciliation loop running");
    loop {
        if let Err(e) = inner.reconcile(&shutdown).await {
            error!(error = %e, "reconciliation loop stopped");
            return;
        }
        tokio::select! {
            _ = shutdown.changed() => return,
            _ = tokio::time::sleep(inner.config.sync_cooldown) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{community, FakeContract, MemoryStore};
    use alloy::primitives::U256;
    use hub_service::{Census, ServiceError, TriState};

    fn registry() -> ChainRegistry {
        ChainRegistry::new([("eth", 1), ("base", 8453)])
    }

    fn engine(contracts: Vec<Arc<FakeContract>>, store: Arc<MemoryStore>) -> SyncEngine {
        let contracts = contracts
            .into_iter()
            .map(|c| c as Arc<dyn CommunityContract>)
            .collect();
        let config = SyncConfig {
            discover_cooldown: Duration::from_millis(10),
            sync_cooldown: Duration::from_millis(10),
        };
        SyncEngine::new(registry(), contracts, store, config).unwrap()
    }

    fn idle() -> watch::Receiver<bool> {
        watch::channel(false).1
    }

    #[test]
    fn test_construction_checks_configuration() {
        let store: Arc<dyn CommunityStore> = Arc::new(MemoryStore::default());
        let eth: Arc<dyn CommunityContract> = Arc::new(FakeContract::new("eth", 1));

        let err = SyncEngine::new(ChainRegistry::default(), vec![eth.clone()], store.clone(), SyncConfig::default());
        assert!(matches!(err, Err(SyncError::Config(_))));

        let err = SyncEngine::new(registry(), vec![], store.clone(), SyncConfig::default());
        assert!(matches!(err, Err(SyncError::Config(_))));

        let celo: Arc<dyn CommunityContract> = Arc::new(FakeContract::new("celo", 42220));
        let err = SyncEngine::new(registry(), vec![celo], store.clone(), SyncConfig::default());
        assert!(matches!(err, Err(SyncError::Config(_))));

        let wrong_id: Arc<dyn CommunityContract> = Arc::new(FakeContract::new("eth", 5));
        let err = SyncEngine::new(registry(), vec![wrong_id], store.clone(), SyncConfig::default());
        assert!(matches!(err, Err(SyncError::Config(_))));

        let err = SyncEngine::new(registry(), vec![eth.clone(), eth], store, SyncConfig::default());
        assert!(matches!(err, Err(SyncError::Config(_))));
    }

    #[tokio::test]
    async fn test_unconfigured_chain_is_a_routing_error() {
        let eth = Arc::new(FakeContract::new("eth", 1));
        let engine = engine(vec![eth.clone()], Arc::new(MemoryStore::default()));

        let err = engine.onchain_community("base:3").await.unwrap_err();
        assert!(err.is_routing());
        assert!(matches!(err, SyncError::Chain(ChainError::NoContract(ref alias)) if alias == "base"));

        let err = engine.onchain_community("celo:3").await.unwrap_err();
        assert!(matches!(err, SyncError::Service(ServiceError::UnknownChainAlias(_))));
        assert_eq!(eth.rpc_calls(), 0);
    }

    #[tokio::test]
    async fn test_discovery_inserts_new_community() {
        let eth = Arc::new(FakeContract::new("eth", 1));
        eth.put(1, community("eth:1", "One", &[100]));
        eth.set_next(1);
        let store = Arc::new(MemoryStore::default());
        let engine = engine(vec![eth], store.clone());

        engine.inner.discover(&idle()).await.unwrap();

        let stored = store.get("eth:1").unwrap();
        assert_eq!(stored.name, "One");
        // unset flag was defaulted by validation
        assert_eq!(stored.disabled, TriState::True);
    }

    #[tokio::test]
    async fn test_discovery_ignores_empty_slot() {
        let eth = Arc::new(FakeContract::new("eth", 1));
        eth.put(1, community("eth:1", "One", &[100]));
        eth.set_next(2);
        let store = Arc::new(MemoryStore::default());
        let engine = engine(vec![eth], store.clone());

        engine.inner.discover(&idle()).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_discovery_merges_already_stored_community() {
        let eth = Arc::new(FakeContract::new("eth", 1));
        eth.put(2, community("eth:2", "Renamed", &[100, 300]));
        eth.set_next(2);
        let store = Arc::new(MemoryStore::default());
        store.insert(community("eth:2", "Original", &[100]));
        let engine = engine(vec![eth], store.clone());

        engine.inner.discover(&idle()).await.unwrap();

        let stored = store.get("eth:2").unwrap();
        assert_eq!(stored.name, "Renamed");
        assert_eq!(stored.admins, vec![100, 300]);
    }

    #[tokio::test]
    async fn test_duplicate_insert_falls_back_to_merge() {
        let eth = Arc::new(FakeContract::new("eth", 1));
        let store = Arc::new(MemoryStore::default());
        // the record shows up between the lookup and the insert
        store.race_on_next_add(community("eth:1", "Raced", &[100]));
        let engine = engine(vec![eth], store.clone());

        let outcome = engine.inner.persist(&community("eth:1", "Fresh", &[100])).unwrap();
        assert_eq!(outcome, Persisted::Merged);
        assert_eq!(store.get("eth:1").unwrap().name, "Fresh");
    }

    #[tokio::test]
    async fn test_reconcile_merges_and_self_heals() {
        let eth = Arc::new(FakeContract::new("eth", 1));
        eth.put(1, community("eth:1", "", &[100, 300]));
        eth.put(2, community("eth:2", "Two", &[200]));
        eth.put(4, community("eth:4", "Four", &[400]));
        eth.set_next(5);
        let store = Arc::new(MemoryStore::default());
        store.insert(Community {
            disabled: TriState::False,
            ..community("eth:1", "Old", &[100, 200])
        });
        let engine = engine(vec![eth], store.clone());

        engine.inner.reconcile(&idle()).await.unwrap();

        let one = store.get("eth:1").unwrap();
        assert_eq!(one.name, "Old");
        assert_eq!(one.admins, vec![100, 300]);
        assert_eq!(store.get("eth:2").unwrap().name, "Two");
        assert!(store.get("eth:3").is_none());
        assert_eq!(store.get("eth:4").unwrap().name, "Four");
        assert_eq!(store.written_ids(), vec!["eth:1", "eth:2", "eth:4"]);
    }

    #[tokio::test]
    async fn test_reconcile_skips_creator_violation() {
        let eth = Arc::new(FakeContract::new("eth", 1));
        eth.put(1, community("eth:1", "Hijacked", &[999, 300]));
        eth.put(2, community("eth:2", "Two", &[200]));
        eth.set_next(3);
        let store = Arc::new(MemoryStore::default());
        store.insert(community("eth:1", "Old", &[100, 200]));
        let engine = engine(vec![eth], store.clone());

        engine.inner.reconcile(&idle()).await.unwrap();

        let one = store.get("eth:1").unwrap();
        assert_eq!(one.name, "Old");
        assert_eq!(one.admins, vec![100, 200]);
        assert!(store.get("eth:2").is_some());
    }

    #[tokio::test]
    async fn test_read_failure_skips_only_that_contract() {
        let eth = Arc::new(FakeContract::new("eth", 1));
        eth.put(1, community("eth:1", "One", &[100]));
        eth.set_next(2);
        eth.fail_reads();
        let base = Arc::new(FakeContract::new("base", 8453));
        base.put(1, community("base:1", "Base one", &[100]));
        base.put(2, community("base:2", "Base two", &[200]));
        base.set_next(2);
        let store = Arc::new(MemoryStore::default());
        let engine = engine(vec![eth, base], store.clone());

        engine.inner.discover(&idle()).await.unwrap();
        assert_eq!(store.get("base:2").unwrap().name, "Base two");

        engine.inner.reconcile(&idle()).await.unwrap();
        assert_eq!(store.get("base:1").unwrap().name, "Base one");
        assert!(store.get("eth:1").is_none());
    }

    #[tokio::test]
    async fn test_community_read_failure_is_skipped() {
        let eth = Arc::new(FakeContract::new("eth", 1));
        eth.put(1, community("eth:1", "One", &[100]));
        eth.set_next(2);
        eth.fail_community_reads();
        let base = Arc::new(FakeContract::new("base", 8453));
        base.put(1, community("base:1", "Base one", &[100]));
        base.set_next(2);
        let store = Arc::new(MemoryStore::default());
        let engine = engine(vec![eth.clone(), base], store.clone());

        engine.inner.discover(&idle()).await.unwrap();
        engine.inner.reconcile(&idle()).await.unwrap();

        assert!(store.get("eth:1").is_none());
        assert_eq!(store.written_ids(), vec!["base:1"]);
    }

    #[tokio::test]
    async fn test_reconcile_stops_on_closed_store() {
        let eth = Arc::new(FakeContract::new("eth", 1));
        eth.put(1, community("eth:1", "One", &[100]));
        eth.put(2, community("eth:2", "Two", &[200]));
        eth.set_next(3);
        let store = Arc::new(MemoryStore::default());
        store.close();
        let engine = engine(vec![eth.clone()], store);

        let err = engine.inner.reconcile(&idle()).await.unwrap_err();
        assert!(err.is_store_closed());
        // next ID plus the first community, nothing after the failure
        assert_eq!(eth.rpc_calls(), 2);
    }

    #[tokio::test]
    async fn test_reconcile_respects_cancellation() {
        let eth = Arc::new(FakeContract::new("eth", 1));
        eth.set_next(100);
        let engine = engine(vec![eth.clone()], Arc::new(MemoryStore::default()));

        let (tx, rx) = watch::channel(true);
        engine.inner.reconcile(&rx).await.unwrap();
        drop(tx);
        assert_eq!(eth.rpc_calls(), 0);
    }

    #[tokio::test]
    async fn test_discovery_then_reconcile_converges() {
        let eth = Arc::new(FakeContract::new("eth", 1));
        let onchain = Community {
            notifications: TriState::True,
            disabled: TriState::False,
            census: Census::Followers("builders".to_string()),
            ..community("eth:3", "Three", &[100, 200])
        };
        eth.put(3, onchain.clone());
        eth.set_next(4);
        let store = Arc::new(MemoryStore::default());
        let engine = engine(vec![eth], store.clone());

        engine.inner.discover(&idle()).await.unwrap();
        engine.inner.reconcile(&idle()).await.unwrap();

        assert_eq!(store.get("eth:3"), Some(merge(None, &onchain).unwrap()));
    }

    #[tokio::test]
    async fn test_update_community_writes_chain_then_store() {
        let eth = Arc::new(FakeContract::new("eth", 1));
        let store = Arc::new(MemoryStore::default());
        store.insert(community("eth:4", "Old", &[100, 200]));
        let engine = engine(vec![eth.clone()], store.clone());

        let merged = engine
            .update_community(&community("eth:4", "", &[100, 300]))
            .await
            .unwrap();

        assert_eq!(merged.name, "Old");
        assert_eq!(merged.admins, vec![100, 300]);
        assert_eq!(eth.written(), vec![merged.clone()]);
        assert_eq!(store.get("eth:4"), Some(merged));
    }

    #[tokio::test]
    async fn test_update_community_leaves_store_on_chain_failure() {
        let eth = Arc::new(FakeContract::new("eth", 1));
        eth.fail_writes();
        let store = Arc::new(MemoryStore::default());
        store.insert(community("eth:4", "Old", &[100, 200]));
        let engine = engine(vec![eth], store.clone());

        let err = engine
            .update_community(&community("eth:4", "New", &[100]))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Chain(ChainError::SendTransaction(_))));
        assert_eq!(store.get("eth:4").unwrap().name, "Old");
    }

    #[tokio::test]
    async fn test_update_community_rejects_new_creator() {
        let eth = Arc::new(FakeContract::new("eth", 1));
        let store = Arc::new(MemoryStore::default());
        store.insert(community("eth:4", "Old", &[100, 200]));
        let engine = engine(vec![eth.clone()], store.clone());

        let err = engine
            .update_community(&community("eth:4", "", &[999, 300]))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Service(ServiceError::NoAdminCreator { .. })));
        assert!(eth.written().is_empty());
        assert_eq!(store.get("eth:4").unwrap().admins, vec![100, 200]);
    }

    #[tokio::test]
    async fn test_update_community_keeps_permission_and_funds() {
        let eth = Arc::new(FakeContract::new("eth", 1));
        eth.put(4, Community {
            funds: U256::from(7),
            create_election_permission: 1,
            ..community("eth:4", "Old", &[100, 200])
        });
        let store = Arc::new(MemoryStore::default());
        store.insert(community("eth:4", "Old", &[100, 200]));
        let engine = engine(vec![eth.clone()], store.clone());

        let update = Community {
            create_election_permission: 2,
            ..community("eth:4", "New", &[100, 200])
        };
        let merged = engine.update_community(&update).await.unwrap();

        let written = eth.written();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].create_election_permission, 2);
        assert_eq!(written[0].funds, U256::from(7));
        assert_eq!(merged, written[0]);
    }

    #[tokio::test]
    async fn test_update_community_rejects_non_canonical_id() {
        let eth = Arc::new(FakeContract::new("eth", 1));
        let store = Arc::new(MemoryStore::default());
        store.insert(community("eth:5", "Five", &[100, 200]));
        let engine = engine(vec![eth.clone()], store.clone());

        for id in ["eth:05", "eth:+5", "eth:0005"] {
            let err = engine
                .update_community(&community(id, "Hijacked", &[999]))
                .await
                .unwrap_err();
            assert!(matches!(err, SyncError::Service(ServiceError::MalformedCommunityId(_))));
        }
        assert!(eth.written().is_empty());
        assert_eq!(eth.rpc_calls(), 0);
        assert!(store.written_ids().is_empty());
        assert_eq!(store.get("eth:5").unwrap().admins, vec![100, 200]);
    }

    #[tokio::test]
    async fn test_sweeps_against_mdbx_store() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempfile::tempdir()?;
        let db = hub_database::InnerDatabase::new(temp_dir.path().join("test_db"))?;
        let store = Arc::new(hub_database::CommunityDb::new(db, registry()));

        let eth = Arc::new(FakeContract::new("eth", 1));
        eth.put(1, community("eth:1", "One", &[100]));
        eth.put(2, community("eth:2", "Two", &[200]));
        eth.set_next(2);
        let contracts: Vec<Arc<dyn CommunityContract>> = vec![eth.clone()];
        let engine = SyncEngine::new(registry(), contracts, store.clone(), SyncConfig::default())?;

        engine.inner.discover(&idle()).await?;
        engine.inner.reconcile(&idle()).await?;
        let mut names: Vec<String> = store.communities()?.into_iter().map(|c| c.name).collect();
        names.sort();
        assert_eq!(names, vec!["One", "Two"]);

        store.close();
        let err = engine.inner.reconcile(&idle()).await.unwrap_err();
        assert!(err.is_store_closed());
        Ok(())
    }

    #[tokio::test]
    async fn test_engine_runs_once() {
        let eth = Arc::new(FakeContract::new("eth", 1));
        eth.put(1, community("eth:1", "One", &[100]));
        eth.set_next(2);
        let store = Arc::new(MemoryStore::default());
        let engine = engine(vec![eth], store.clone());

        assert_eq!(engine.state(), EngineState::Stopped);
        engine.start().unwrap();
        assert_eq!(engine.state(), EngineState::Running);
        assert!(matches!(engine.start(), Err(SyncError::AlreadyStarted)));

        // first reconciliation pass runs right away
        for _ in 0..50 {
            if store.get("eth:1").is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(store.get("eth:1").is_some());

        engine.stop().await;
        assert_eq!(engine.state(), EngineState::Stopped);
        assert!(matches!(engine.start(), Err(SyncError::AlreadyStarted)));
    }
}
