pub mod discover;
pub mod encode;
pub mod read;
pub mod verify;

use anyhow::{Context, Result};
use credgov_registry::config::Config;
use credgov_registry::{ChainSource, DomainReader, RpcSource};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Connect to the configured RPC and register the configured resolvers.
pub async fn connect(config: &Config) -> Result<Arc<DomainReader<RpcSource>>> {
    let source = RpcSource::new(&config.network.rpc_url, config.contracts.registry)?;

    let chain_id = source
        .chain_id()
        .await
        .context("Failed to reach the RPC endpoint")?;
    if chain_id != config.network.chain_id {
        warn!(
            "RPC reports chain {} but configuration says {}",
            chain_id, config.network.chain_id
        );
    }
    let registry = source.registry();
    let mut reader = DomainReader::new(Arc::new(source), config.network.chain_id);
    for resolver in &config.resolvers {
        reader.add_known_resolver(config.network.chain_id, resolver.address, resolver.version);
    }
    for (address, version) in reader.known_resolvers() {
        debug!("Resolver {} reads as {}", address, version);
    }

    info!(
        "Connected to chain {} (registry {}) with {} known resolvers",
        chain_id,
        registry,
        reader.known_resolvers().count()
    );

    Ok(Arc::new(reader))
}

/// Print a serializable value as pretty JSON.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
