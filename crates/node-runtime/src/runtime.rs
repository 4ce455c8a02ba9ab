//! # Solo Block Loop
//!
//! Stands in for the consensus engine on a single-node devnet: opens, ends
//! and commits one block per interval with the first genesis validator as
//! proposer.

use crate::config::NodeConfig;
use anyhow::{Context, Result};
use sc_07_block_app::{AppStores, BlockApplication, BlockHeader, CommitResponse, GenesisDoc, Phase};
use shared_types::{short_hex, Address};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

pub struct NodeRuntime {
    app: Arc<BlockApplication>,
    config: NodeConfig,
    proposer: Address,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl NodeRuntime {
    /// Create the block application and seed genesis unless state was
    /// recovered.
    pub fn new(config: NodeConfig, genesis: &GenesisDoc) -> Result<Self> {
        let stores = AppStores::in_memory(config.app.query_history_limit);
        let app = BlockApplication::new(config.app.clone(), stores).context("Failed to create block application")?;

        if app.phase() == Phase::Uninitialized {
            let app_hash = app.init_chain(genesis).context("Failed to initialize chain")?;
            info!("Chain {} initialized, genesis app hash {}", genesis.chain_id, short_hex(&app_hash));
        }
        let proposer = genesis
            .validators
            .first()
            .map(|v| v.address)
            .context("Genesis has no validators")?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(Self {
            app: Arc::new(app),
            config,
            proposer,
            shutdown_tx,
            shutdown_rx,
        })
    }

    pub fn app(&self) -> Arc<BlockApplication> {
        Arc::clone(&self.app)
    }

    /// Run one empty block through the full lifecycle.
    pub async fn produce_block(&self) -> CommitResponse {
        let height = self.app.info().last_height + 1;
        self.app.begin_block(BlockHeader::new(height, self.proposer));
        self.app.end_block(height).await;
        self.app.commit()
    }

    /// Produce blocks until `shutdown` is called.
    pub async fn run(&self) -> Result<()> {
        let mut interval = tokio::time::interval(self.config.block_interval);
        let mut shutdown = self.shutdown_rx.clone();
        info!("Block loop started, interval {:?}", self.config.block_interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.produce_block().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Shutdown signal received");
                        return Ok(());
                    }
                }
            }
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Drain in-flight work and release the stores.
    pub async fn close(&self) -> Result<()> {
        self.app.close().await.context("Failed to close block application")?;
        info!("Shutdown complete");
        Ok(())
    }
}
