//! # Wire Codec
//!
//! Transactions travel as bincode (varint integers, little endian, trailing
//! bytes rejected, size-limited). The same options are used in both
//! directions so encode/decode is a bijection on valid transactions.

use super::entities::Trx;
use bincode::Options;
use shared_types::{keccak256, sha256, AppError, AppResult, Hash};

/// Upper bound on an encoded transaction.
pub const MAX_TRX_BYTES: u64 = 64 * 1024;

fn options() -> impl Options {
    bincode::DefaultOptions::new().with_limit(MAX_TRX_BYTES)
}

/// Encode a transaction for the wire.
pub fn encode_trx(trx: &Trx) -> AppResult<Vec<u8>> {
    options()
        .serialize(trx)
        .map_err(|e| AppError::Decode(format!("encode: {e}")))
}

/// Decode wire bytes. Malformed input and unknown payload tags fail here.
pub fn decode_trx(bytes: &[u8]) -> AppResult<Trx> {
    options()
        .deserialize(bytes)
        .map_err(|e| AppError::Decode(e.to_string()))
}

/// Hash identifying a transaction: SHA-256 of its wire bytes.
pub fn trx_hash(raw: &[u8]) -> Hash {
    sha256(raw)
}

/// Hash that is signed: keccak256 of the encoding with `sig` cleared.
pub fn signing_hash(trx: &Trx) -> AppResult<Hash> {
    let bytes = encode_trx(&trx.unsigned())?;
    Ok(keccak256(&bytes))
}
