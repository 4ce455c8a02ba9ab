//! # State-Machine Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── support.rs        # Chain fixture: genesis, wallets, block driver
//! └── integration/      # Cross-crate scenarios through BlockApplication
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p sc-tests
//! cargo test -p sc-tests integration::governance
//! cargo bench -p sc-tests
//! ```

pub mod integration;
pub mod support;
