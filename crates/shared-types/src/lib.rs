//! # Shared Types Crate
//!
//! Entities, protocol parameters and the error taxonomy shared by the
//! account, staking and governance controllers and by the block application.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: anything crossing a controller boundary is
//!   defined here, never duplicated per subsystem.
//! - **Explicit Views**: every controller read and write names the ledger view
//!   it targets through [`ExecMode`].
//! - **Stable Codes**: every [`AppError`] variant maps to a numeric code that is
//!   surfaced unchanged through the check/deliver/query protocol responses.

pub mod entities;
pub mod errors;
pub mod hashing;
pub mod params;

pub use entities::*;
pub use errors::*;
pub use hashing::*;
pub use params::*;
