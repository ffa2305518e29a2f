//! The lock-then-mutate protocol.
//!
//! Before a store mutation is issued, every key it touches gets a lock item in
//! each configured cache tier. Readers that find a lock go to the store
//! instead of trusting the cache. Locks for puts are released once the store
//! call returns; locks for deletes stay behind as tombstones.

use crate::context::Context;
use crate::domain::{CacheItem, Key};
use crate::ports::{CacheKeyNamer, Cacher, ErrorSink};
use shared::Result;
use shared::config::{Config, LockFailurePolicy};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// One configured cache backend together with how its keys are named and
/// what happens when locking it fails.
#[derive(Clone)]
pub struct CacheTier {
    name: &'static str,
    cacher: Arc<dyn Cacher>,
    namer: Arc<dyn CacheKeyNamer>,
    policy: LockFailurePolicy,
}

impl CacheTier {
    pub fn new(
        name: &'static str,
        cacher: Arc<dyn Cacher>,
        namer: Arc<dyn CacheKeyNamer>,
        policy: LockFailurePolicy,
    ) -> Self {
        Self {
            name,
            cacher,
            namer,
            policy,
        }
    }

    /// Cache keys and lock items for `keys` under this tier's naming.
    pub fn cache_locks<'k>(
        &self,
        ctx: &Context,
        keys: impl IntoIterator<Item = &'k Key>,
        ttl: Duration,
    ) -> CacheLocks {
        let mut locks = CacheLocks::default();
        for key in keys {
            let cache_key = self.namer.cache_key(ctx, key);
            locks.items.push(CacheItem::lock(cache_key.clone(), ttl));
            locks.cache_keys.push(cache_key);
        }
        locks
    }
}

impl Debug for CacheTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheTier")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .finish()
    }
}

/// Lock items for a set of keys and the cache keys they were written under.
#[derive(Clone, Debug, Default)]
pub struct CacheLocks {
    pub cache_keys: Vec<String>,
    pub items: Vec<CacheItem>,
}

/// What to write to, and later release from, one tier.
#[derive(Debug)]
pub struct TierLocks {
    tier: usize,
    pub items: Vec<CacheItem>,
    pub release_keys: Vec<String>,
}

/// Locks planned for one call across all tiers, in tier order.
#[derive(Debug, Default)]
pub struct LockSet {
    tiers: Vec<TierLocks>,
}

/// Drives lock writes and releases against the configured tiers.
#[derive(Clone)]
pub struct LockProtocol {
    tiers: Vec<CacheTier>,
    sink: Arc<dyn ErrorSink>,
    lock_ttl: Duration,
}

impl LockProtocol {
    pub fn new(tiers: Vec<CacheTier>, sink: Arc<dyn ErrorSink>, lock_ttl: Duration) -> Self {
        Self {
            tiers,
            sink,
            lock_ttl: Config::checked_lock_ttl(lock_ttl),
        }
    }

    /// No tiers configured: calls go straight to the store.
    pub fn is_disabled(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Plan locks for every tier. `lock_and_release` keys are released after
    /// the store call, `lock_only` keys keep their locks.
    pub fn plan(&self, ctx: &Context, lock_and_release: &[&Key], lock_only: &[&Key]) -> LockSet {
        let tiers = self
            .tiers
            .iter()
            .enumerate()
            .map(|(index, tier)| {
                let released = tier.cache_locks(ctx, lock_and_release.iter().copied(), self.lock_ttl);
                let kept = tier.cache_locks(ctx, lock_only.iter().copied(), self.lock_ttl);

                let mut items = released.items;
                items.extend(kept.items);
                TierLocks {
                    tier: index,
                    items,
                    release_keys: released.cache_keys,
                }
            })
            .collect();

        LockSet { tiers }
    }

    /// Write the planned lock items, tier by tier, in order.
    ///
    /// A fail-fast tier that rejects its locks stops the call and its error
    /// is returned; a best-effort tier's failure goes to the error sink and
    /// the remaining tiers are still locked.
    pub async fn acquire(&self, ctx: &Context, locks: &LockSet) -> Result<()> {
        for planned in &locks.tiers {
            if planned.items.is_empty() {
                continue;
            }
            let tier = &self.tiers[planned.tier];
            let span = tracing::debug_span!(
                "cache.set_multi",
                tier = tier.name,
                items = planned.items.len()
            );

            let written = tier
                .cacher
                .set_multi(ctx, &planned.items)
                .instrument(span)
                .await;

            if let Err(err) = written {
                match tier.policy {
                    LockFailurePolicy::FailFast => {
                        tracing::debug!(tier = tier.name, error = %err, "lock write failed, aborting");
                        return Err(err);
                    }
                    LockFailurePolicy::BestEffort => {
                        self.sink.report(ctx, err.wrap("lock cache.SetMulti"));
                    }
                }
            }
        }
        Ok(())
    }

    /// Remove the release keys from every tier. Failures only reach the sink.
    pub async fn release(&self, ctx: &Context, locks: &LockSet) {
        for planned in &locks.tiers {
            if planned.release_keys.is_empty() {
                continue;
            }
            let tier = &self.tiers[planned.tier];
            let span = tracing::debug_span!(
                "cache.delete_multi",
                tier = tier.name,
                keys = planned.release_keys.len()
            );

            if let Err(err) = tier
                .cacher
                .delete_multi(ctx, &planned.release_keys)
                .instrument(span)
                .await
            {
                self.sink.report(ctx, err.wrap("release cache.DeleteMulti"));
            }
        }
    }
}

impl Debug for LockProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockProtocol")
            .field("tiers", &self.tiers)
            .field("lock_ttl", &self.lock_ttl)
            .finish()
    }
}
