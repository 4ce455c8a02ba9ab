//! # sc-02-transaction
//!
//! Transaction model and execution-context builder.
//!
//! ## Architecture
//!
//! - **Domain** (`domain/`): `Trx`, the closed `TrxPayload` variant type, the
//!   bincode wire codec and secp256k1 signing/recovery
//! - **Ports** (`ports/`): the seams controllers plug into (`TrxHandler`,
//!   `ValidatorPower`) and the `ContextResolver` callback
//! - **Context** (`context.rs`): `TrxContext` and `TrxContextBuilder`
//!
//! ## Build Pipeline
//!
//! ```text
//! raw bytes ──decode──→ Trx ──amount/gas──→ resolve sender ──nonce──→ funds
//!                                                                       │
//!                     TrxContext ←──(execution only) signature recovery ┘
//! ```
//!
//! The builder has no controller dependencies: sender lookup, the governance
//! parameter snapshot and the controller references all come from the
//! injected `ContextResolver`.

pub mod context;
pub mod domain;
pub mod ports;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use context::{ReplacedVote, TrxContext, TrxContextBuilder};
pub use domain::codec::{decode_trx, encode_trx, signing_hash, trx_hash, MAX_TRX_BYTES};
pub use domain::crypto::{address_from_pubkey, address_from_pubkey_bytes, recover_signer, sign_trx};
pub use domain::entities::{ProposalKind, ProposalPayload, Trx, TrxKind, TrxPayload, TRX_VERSION};
pub use ports::{ContextResolver, TrxHandler, TrxHandlers, ValidatorPower};
