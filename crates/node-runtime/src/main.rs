//! # Node Runtime
//!
//! Entry point of a single-node devnet.
//!
//! ## Startup Sequence
//!
//! 1. Install logging (`RUST_LOG`, default `info`)
//! 2. Load configuration from `SC_*` environment variables
//! 3. Load the genesis file, or generate a devnet genesis
//! 4. Create the block application and seed genesis
//! 5. Produce blocks until Ctrl+C, then drain and close

use std::sync::Arc;

use anyhow::Result;
use node_runtime::genesis::{devnet_genesis, load_genesis};
use node_runtime::{NodeConfig, NodeRuntime};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_CHAIN_ID: &str = "sc-devnet";

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = NodeConfig::from_env()?;
    let genesis = match &config.genesis_path {
        Some(path) => load_genesis(path)?,
        None if config.app.chain_id.is_empty() => devnet_genesis(DEFAULT_CHAIN_ID),
        None => devnet_genesis(&config.app.chain_id),
    };

    let runtime = Arc::new(NodeRuntime::new(config, &genesis)?);
    let worker = {
        let runtime = Arc::clone(&runtime);
        tokio::spawn(async move { runtime.run().await })
    };

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown();
    worker.await??;
    runtime.close().await?;
    Ok(())
}
