#![deny(clippy::all)]

use crate::context::Context;
use crate::domain::{CacheItem, Key, Mutation};
use async_trait::async_trait;
use shared::{BatchResult, Error, Result};

// Ports are the collaborator seams: the store, the cache tiers, cache key
// naming and the error sink for best-effort failures.

/// Port for the strongly-consistent keyed store
#[async_trait]
pub trait Datastore: Send + Sync + 'static {
    /// Delete at most [`shared::config::Config::MAX_BATCH`] keys.
    /// Per-key failures come back as a positional `BatchError::Multi`.
    async fn delete_multi(&self, ctx: &Context, keys: &[Key]) -> BatchResult;

    /// Apply typed mutations in one call, returning the keys they produced.
    async fn mutate(&self, ctx: &Context, mutations: &[Mutation]) -> BatchResult<Vec<Key>>;
}

/// Port for one cache tier (e.g. memcache, redis, an in-process moka cache)
#[async_trait]
pub trait Cacher: Send + Sync + 'static {
    async fn set_multi(&self, ctx: &Context, items: &[CacheItem]) -> Result<()>;

    /// Removing keys that are not present is not an error.
    async fn delete_multi(&self, ctx: &Context, keys: &[String]) -> Result<()>;
}

/// Port for deriving a cache key string from a store key.
/// Must be deterministic: the read path derives the same names.
pub trait CacheKeyNamer: Send + Sync + 'static {
    fn cache_key(&self, ctx: &Context, key: &Key) -> String;
}

/// Port for reporting failures of best-effort operations.
/// Never invoked for errors that are returned to the caller.
pub trait ErrorSink: Send + Sync + 'static {
    fn report(&self, ctx: &Context, err: Error);
}

impl<F> ErrorSink for F
where
    F: Fn(&Context, Error) + Send + Sync + 'static,
{
    fn report(&self, ctx: &Context, err: Error) {
        self(ctx, err)
    }
}
