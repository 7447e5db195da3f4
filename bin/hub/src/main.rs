//! hub: keeps a local community store in sync with the community hub
//! contracts of every configured chain.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use hub_chain::{CommunityContract, ContractGateway, EvmConnector, GatewayParams};
use hub_database::{CommunityDb, InnerDatabase};
use hub_sync::SyncEngine;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;

const DEFAULT_LOG_FILTER: &str = "hub=info,hub_sync=info,hub_chain=info";

#[derive(Parser)]
#[command(name = "hub")]
#[command(about = "Community hub sync service")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "hub.toml")]
    config: PathBuf,

    /// Database directory (overrides config file)
    #[arg(long, env = "HUB_DATABASE_PATH")]
    database_path: Option<PathBuf>,

    /// Hex encoded signing key (overrides config file)
    #[arg(long, env = "HUB_PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?;
    if let Some(database_path) = cli.database_path {
        config.database_path = database_path;
    }
    if let Some(private_key) = cli.private_key {
        config.private_key = Some(private_key);
    }

    info!(
        config = %cli.config.display(),
        database = %config.database_path.display(),
        chains = config.chains.len(),
        "starting hub"
    );

    let registry = config.aliases();
    let db = InnerDatabase::new(&config.database_path)?;
    let store = Arc::new(CommunityDb::new(db, registry.clone()));

    let mut contracts: Vec<Arc<dyn CommunityContract>> = Vec::new();
    for (alias, address) in config.contracts()? {
        let Some(chain) = config.chains.get(&alias) else {
            continue;
        };
        let gateway = ContractGateway::connect(
            &EvmConnector,
            registry.clone(),
            GatewayParams {
                chain_alias: alias,
                chain_id: chain.chain_id,
                endpoint: chain.rpc_endpoint.clone(),
                contract: address,
                private_key: config.private_key.clone(),
            },
        )?;
        contracts.push(Arc::new(gateway));
    }

    let engine = SyncEngine::new(registry, contracts, store.clone(), config.sync_config())?;
    engine.start()?;

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");

    engine.stop().await;
    store.close();
    info!("hub stopped");
    Ok(())
}
