//! # Genesis Loading
//!
//! Reads the genesis document from disk, or generates a single-validator
//! devnet genesis when none is configured.

use anyhow::{Context, Result};
use k256::ecdsa::SigningKey;
use sc_02_transaction::address_from_pubkey;
use sc_07_block_app::{GenesisDoc, GenesisHolder, GenesisValidator};
use shared_types::{short_hex, GovParams};
use std::path::Path;
use tracing::info;

/// Balance given to the devnet validator.
pub const DEVNET_BALANCE: u128 = 1_000_000_000_000;

/// Power of the devnet validator.
pub const DEVNET_POWER: u64 = 100;

pub fn load_genesis(path: &Path) -> Result<GenesisDoc> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read genesis {}", path.display()))?;
    let genesis = GenesisDoc::from_json(&bytes).context("Failed to parse genesis")?;
    genesis.validate().context("Invalid genesis")?;
    info!(
        "Loaded genesis {} from {}: {} validators, {} holders",
        genesis.chain_id,
        path.display(),
        genesis.validators.len(),
        genesis.holders.len()
    );
    Ok(genesis)
}

/// A fresh single-validator genesis with a random key.
pub fn devnet_genesis(chain_id: &str) -> GenesisDoc {
    let key = SigningKey::random(&mut rand::thread_rng());
    let address = address_from_pubkey(key.verifying_key());
    let pub_key = key.verifying_key().to_encoded_point(true).as_bytes().to_vec();
    info!("Generated devnet validator {}", short_hex(&address));

    GenesisDoc {
        chain_id: chain_id.to_string(),
        validators: vec![GenesisValidator {
            address,
            pub_key,
            power: DEVNET_POWER,
        }],
        holders: vec![GenesisHolder {
            address,
            balance: DEVNET_BALANCE,
        }],
        gov_params: GovParams::devnet(),
    }
}
