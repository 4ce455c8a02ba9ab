//! # Transaction Signatures (secp256k1)
//!
//! Recoverable ECDSA over the keccak256 signing hash. The signer address is
//! the last 20 bytes of keccak256 of the uncompressed public key (without the
//! 0x04 prefix).

use super::codec::signing_hash;
use super::entities::Trx;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use shared_types::{keccak256, Address, AppError, AppResult};

/// Sign `trx` in place with `key`.
pub fn sign_trx(trx: &mut Trx, key: &SigningKey) -> AppResult<()> {
    let hash = signing_hash(trx)?;
    let (sig, recid) = key
        .sign_prehash_recoverable(&hash)
        .map_err(|_| AppError::InvalidSignature)?;

    let mut bytes = Vec::with_capacity(65);
    bytes.extend_from_slice(&sig.to_bytes());
    bytes.push(recid.to_byte());
    trx.sig = bytes;
    Ok(())
}

/// Recover the signer of `trx`.
///
/// Returns the signer address and its compressed (33-byte) public key.
pub fn recover_signer(trx: &Trx) -> AppResult<(Address, Vec<u8>)> {
    if trx.sig.len() != 65 {
        return Err(AppError::InvalidSignature);
    }

    let recovery_id = parse_recovery_id(trx.sig[64])?;
    let sig = Signature::from_slice(&trx.sig[..64]).map_err(|_| AppError::InvalidSignature)?;
    let hash = signing_hash(trx)?;

    let key = VerifyingKey::recover_from_prehash(&hash, &sig, recovery_id)
        .map_err(|_| AppError::InvalidSignature)?;

    let compressed = key.to_encoded_point(true).as_bytes().to_vec();
    Ok((address_from_pubkey(&key), compressed))
}

/// Derive the address of a public key.
pub fn address_from_pubkey(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);

    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// Derive the address of a SEC1-encoded (compressed or not) public key.
pub fn address_from_pubkey_bytes(bytes: &[u8]) -> AppResult<Address> {
    let key = VerifyingKey::from_sec1_bytes(bytes)
        .map_err(|_| AppError::InvalidPayload("malformed public key".to_string()))?;
    Ok(address_from_pubkey(&key))
}

/// Accept raw (0, 1) and Ethereum-style (27, 28) recovery ids.
fn parse_recovery_id(v: u8) -> AppResult<RecoveryId> {
    let normalized = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        _ => return Err(AppError::InvalidSignature),
    };
    RecoveryId::from_byte(normalized).ok_or(AppError::InvalidSignature)
}
