//! Hub configuration file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy::primitives::Address;
use anyhow::Context;
use hub_service::ChainRegistry;
use hub_sync::SyncConfig;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Hex encoded signing key. Without it every contract is read-only.
    #[serde(default)]
    pub private_key: Option<String>,

    #[serde(default = "default_discover_cooldown")]
    pub discover_cooldown_secs: u64,

    #[serde(default = "default_sync_cooldown")]
    pub sync_cooldown_secs: u64,

    #[serde(default)]
    pub chains: BTreeMap<String, ChainConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub rpc_endpoint: String,
    /// A chain can be known without a deployed contract.
    #[serde(default)]
    pub contract: Option<String>,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./hub-data")
}
fn default_discover_cooldown() -> u64 { 20 }
fn default_sync_cooldown() -> u64 { 40 }

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            private_key: None,
            discover_cooldown_secs: default_discover_cooldown(),
            sync_cooldown_secs: default_sync_cooldown(),
            chains: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Reads `path`, or falls back to defaults when the file does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Alias to chain ID for every configured chain.
    pub fn aliases(&self) -> ChainRegistry {
        ChainRegistry::new(self.chains.iter().map(|(alias, chain)| (alias.clone(), chain.chain_id)))
    }

    /// Alias to contract address for the chains that have one.
    pub fn contracts(&self) -> anyhow::Result<BTreeMap<String, Address>> {
        self.chains
            .iter()
            .filter_map(|(alias, chain)| chain.contract.as_ref().map(|contract| (alias, contract)))
            .map(|(alias, contract)| {
                let address = contract
                    .parse::<Address>()
                    .with_context(|| format!("invalid contract address for chain {alias}: {contract}"))?;
                Ok::<_, anyhow::Error>((alias.clone(), address))
            })
            .collect()
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            discover_cooldown: Duration::from_secs(self.discover_cooldown_secs),
            sync_cooldown: Duration::from_secs(self.sync_cooldown_secs),
        }
    }
}
