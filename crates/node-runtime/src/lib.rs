//! # Node Runtime Library
//!
//! Configuration loading, genesis loading and the solo block loop, exposed
//! for testing. The entry point is the `main.rs` binary.

pub mod config;
pub mod genesis;
pub mod runtime;

pub use config::{ConfigError, NodeConfig};
pub use runtime::NodeRuntime;
