//! Cross-crate scenarios driven through `BlockApplication`.
//!
//! Each file exercises one area end to end: genesis, blocks of signed
//! transactions, block end and commit, then committed-state queries.

pub mod accounts;
pub mod determinism;
pub mod governance;
