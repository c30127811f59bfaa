use star_notary::{
    api::Server,
    chain::Blockchain,
    clock::{Clock, SystemClock},
    config::Config,
    pool::Mempool,
    store::{BlockStore, MemoryStore, SqliteStore},
    validation::EthereumVerifier,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// The main entry point for the notary node.
///
/// Initializes logging, loads the configuration, opens the block store,
/// bootstraps the chain, starts the mempool reaper and serves the API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // An optional first argument overrides the configuration path
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/default.toml".to_string());
    let config = Config::load(&path)?;
    info!("Notary starting with config: {:?}", config);

    let store: Arc<dyn BlockStore> = if config.database.is_memory() {
        info!("Using in-memory block store; blocks will not survive a restart");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(SqliteStore::connect(&config.database.url, config.database.max_connections).await?)
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Writes the genesis block if the store is empty
    let blockchain = Arc::new(Blockchain::new(store, clock.clone()).await?);
    info!("Chain ready at height {}", blockchain.height().await?);

    let mempool = Arc::new(Mempool::new(
        config.validation.clone(),
        clock.clone(),
        Arc::new(EthereumVerifier),
    ));
    let reaper = mempool
        .clone()
        .spawn_reaper(Duration::from_millis(config.validation.sweep_interval_ms.max(1)));
    info!("Mempool reaper started");

    let server = Server::new(config, blockchain, mempool, clock);
    let result = server.start().await;

    reaper.abort();
    result
}
