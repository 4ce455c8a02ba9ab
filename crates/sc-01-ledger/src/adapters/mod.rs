pub mod memory;

pub use memory::{InMemoryMetaStore, InMemoryVersionedStore};
