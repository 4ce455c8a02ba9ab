//! # Genesis Document
//!
//! JSON document consumed by `InitChain`. Addresses and keys are hex
//! strings (an optional `0x` prefix is accepted); balances are decimal
//! strings so they fit `u128`.
//!
//! ```json
//! {
//!   "chain_id": "devnet",
//!   "validators": [{ "address": "..", "pub_key": "..", "power": 10 }],
//!   "holders": [{ "address": "..", "balance": "1000000000" }],
//!   "gov_params": { "max_validator_count": 21 }
//! }
//! ```

use sc_02_transaction::address_from_pubkey_bytes;
use serde::{Deserialize, Serialize};
use shared_types::{to_hex, Address, AppError, AppResult, GovParams};
use std::collections::HashSet;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisValidator {
    #[serde(with = "hex_address")]
    pub address: Address,
    /// Compressed secp256k1 key. Must derive `address`.
    #[serde(with = "hex_bytes")]
    pub pub_key: Vec<u8>,
    pub power: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisHolder {
    #[serde(with = "hex_address")]
    pub address: Address,
    #[serde(with = "decimal")]
    pub balance: u128,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisDoc {
    pub chain_id: String,
    #[serde(default)]
    pub validators: Vec<GenesisValidator>,
    #[serde(default)]
    pub holders: Vec<GenesisHolder>,
    #[serde(default = "GovParams::devnet")]
    pub gov_params: GovParams,
}

impl GenesisDoc {
    pub fn from_json(bytes: &[u8]) -> AppResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| AppError::InvalidPayload(format!("genesis: {e}")))
    }

    pub fn to_json(&self) -> AppResult<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| AppError::InvalidPayload(format!("genesis: {e}")))
    }

    /// Structural checks. Does not touch any ledger.
    pub fn validate(&self) -> AppResult<()> {
        if self.chain_id.is_empty() {
            return Err(invalid("empty chain id"));
        }
        if self.validators.is_empty() {
            return Err(invalid("no validators"));
        }
        self.gov_params.validate()?;

        let mut seen = HashSet::new();
        for v in &self.validators {
            if v.power == 0 {
                return Err(invalid(format!("validator {} has zero power", to_hex(&v.address))));
            }
            if address_from_pubkey_bytes(&v.pub_key)? != v.address {
                return Err(invalid(format!(
                    "validator {} does not match its public key",
                    to_hex(&v.address)
                )));
            }
            if !seen.insert(v.address) {
                return Err(invalid(format!("duplicate validator {}", to_hex(&v.address))));
            }
        }

        let mut seen = HashSet::new();
        for h in &self.holders {
            if !seen.insert(h.address) {
                return Err(invalid(format!("duplicate holder {}", to_hex(&h.address))));
            }
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> AppError {
    AppError::InvalidPayload(format!("genesis: {}", reason.into()))
}

mod hex_bytes {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(d)?;
        hex::decode(text.trim_start_matches("0x")).map_err(D::Error::custom)
    }
}

mod hex_address {
    use serde::{de::Error, Deserializer, Serializer};
    use shared_types::Address;

    pub fn serialize<S: Serializer>(addr: &Address, s: S) -> Result<S::Ok, S::Error> {
        super::hex_bytes::serialize(addr, s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Address, D::Error> {
        let bytes = super::hex_bytes::deserialize(d)?;
        if bytes.len() != 20 {
            return Err(D::Error::custom(format!("address must be 20 bytes, got {}", bytes.len())));
        }
        let mut addr = [0u8; 20];
        addr.copy_from_slice(&bytes);
        Ok(addr)
    }
}

mod decimal {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u128, D::Error> {
        String::deserialize(d)?.parse().map_err(D::Error::custom)
    }
}
