use crate::batch;
use crate::client::Client;
use crate::context::Context;
use crate::domain::Key;
use shared::{BatchResult, Result};
use tracing::{Instrument, instrument};

impl Client {
    /// Delete any number of keys while keeping the cache tiers consistent.
    ///
    /// Keys are split into sub-batches of at most `max_batch` and the
    /// sub-batches run concurrently. Any failure is reported positionally:
    /// the returned `MultiError` has one entry per input key, in input order.
    #[instrument(name = "lockstep.delete_multi", skip_all, fields(keys = keys.len()))]
    pub async fn delete_multi(&self, ctx: &Context, keys: &[Key]) -> BatchResult {
        let limit = self.max_batch;
        let outcomes = batch::dispatch(keys, limit, |chunk| self.delete_batch(ctx, chunk)).await;
        batch::group_errors(outcomes, keys.len(), limit)
    }

    /// Delete a single key. Errors come back unwrapped, never positional.
    #[instrument(name = "lockstep.delete", skip_all, fields(key = %key))]
    pub async fn delete(&self, ctx: &Context, key: &Key) -> Result<()> {
        match self.delete_batch(ctx, std::slice::from_ref(key)).await {
            Ok(()) => Ok(()),
            Err(err) => err.into_single_key_error().map_or(Ok(()), Err),
        }
    }

    /// Lock one store-sized batch of keys, then delete them from the store.
    /// Delete locks are never released; they stay as tombstones until they
    /// expire.
    async fn delete_batch(&self, ctx: &Context, keys: &[Key]) -> BatchResult {
        if !self.locks.is_disabled() {
            let keys: Vec<&Key> = keys.iter().collect();
            let locks = self.locks.plan(ctx, &[], &keys);
            self.locks.acquire(ctx, &locks).await?;
        }

        self.store
            .delete_multi(ctx, keys)
            .instrument(tracing::debug_span!("store.delete_multi", keys = keys.len()))
            .await
    }
}
