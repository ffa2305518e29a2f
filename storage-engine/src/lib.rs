//! Adapters for the lockstep ports: a moka-backed cache tier and an
//! in-memory store.

pub mod memory_store;
pub mod moka_cache;

pub use memory_store::MemoryDatastore;
pub use moka_cache::MokaCacher;
