//! lockstep - cache-consistent batched deletes and mutations.
//!
//! Sits in front of a strongly-consistent keyed store and one or two
//! eventually-consistent cache tiers. Every delete or mutation first writes a
//! lock item for each affected key to the cache tiers, then calls the store,
//! so a reader never trusts a cached value while the store is changing
//! underneath it.

pub mod batch;
pub mod client;
pub mod context;
mod delete;
pub mod domain;
pub mod locks;
mod mutate;
pub mod naming;
pub mod ports;
pub mod sink;
#[cfg(test)]
mod test_support;

pub use client::{Client, ClientBuilder};
pub use context::Context;
pub use domain::{CacheItem, Key, KeyId, Mutation};
pub use locks::{CacheTier, LockProtocol};
pub use naming::{NamespacedKeyNamer, PrefixedKeyNamer};
pub use ports::{CacheKeyNamer, Cacher, Datastore, ErrorSink};
pub use shared::config::{Config, LockFailurePolicy};
pub use shared::{BatchError, BatchResult, Error, MultiError, Result};
pub use sink::TracingErrorSink;
