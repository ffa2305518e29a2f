use crate::client::Client;
use crate::context::Context;
use crate::domain::{Key, Mutation};
use crate::locks::LockSet;
use shared::BatchResult;
use tracing::{Instrument, instrument};

/// Runs between the lock write and the store call. Lets tests fail a
/// mutation after its locks are in place.
#[cfg(test)]
pub(crate) trait MutateHook: Send + Sync + 'static {
    fn before_mutate(&self) -> shared::Result<()>;
}

#[cfg(test)]
impl<F> MutateHook for F
where
    F: Fn() -> shared::Result<()> + Send + Sync + 'static,
{
    fn before_mutate(&self) -> shared::Result<()> {
        self()
    }
}

impl Client {
    /// Apply typed mutations in a single store call.
    ///
    /// Every mutated key is locked first. Once the store call returns, locks
    /// for inserts, upserts and updates are released whatever the outcome;
    /// delete locks stay behind so readers cannot repopulate the cache with
    /// the pre-delete value. The store result is returned unchanged.
    ///
    /// Mutations are not split: the store rejects more than its own limit.
    #[instrument(name = "lockstep.mutate", skip_all, fields(mutations = mutations.len()))]
    pub async fn mutate(&self, ctx: &Context, mutations: &[Mutation]) -> BatchResult<Vec<Key>> {
        if self.locks.is_disabled() {
            return self.store_mutate(ctx, mutations).await;
        }

        let mut lock_and_release = Vec::with_capacity(mutations.len());
        let mut lock_only = Vec::with_capacity(mutations.len());
        for mutation in mutations {
            // Releasing after a rejected Insert or Update only costs a cache refill.
            if mutation.releases_lock() {
                lock_and_release.push(mutation.key());
            } else {
                lock_only.push(mutation.key());
            }
        }

        let locks = self.locks.plan(ctx, &lock_and_release, &lock_only);
        let result = self.locked_mutate(ctx, &locks, mutations).await;

        // Locks left behind by a dropped call expire with the lock TTL.
        self.locks.release(ctx, &locks).await;
        result
    }

    async fn locked_mutate(
        &self,
        ctx: &Context,
        locks: &LockSet,
        mutations: &[Mutation],
    ) -> BatchResult<Vec<Key>> {
        self.locks.acquire(ctx, locks).await?;

        #[cfg(test)]
        if let Some(hook) = &self.mutate_hook {
            hook.before_mutate()?;
        }

        self.store_mutate(ctx, mutations).await
    }

    async fn store_mutate(&self, ctx: &Context, mutations: &[Mutation]) -> BatchResult<Vec<Key>> {
        self.store
            .mutate(ctx, mutations)
            .instrument(tracing::debug_span!("store.mutate", mutations = mutations.len()))
            .await
    }
}
