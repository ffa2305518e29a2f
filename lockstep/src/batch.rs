//! Splitting large requests into store-sized sub-batches and folding their
//! outcomes back into one positional result.

use futures::future::join_all;
use shared::{BatchError, BatchResult, Error, MultiError};
use std::future::Future;

/// Run `op` once per sub-batch of at most `limit` items, all concurrently,
/// and wait for every one of them. Outcomes are returned in sub-batch order.
///
/// Each sub-batch borrows its slice of `items`; nothing is copied. Dropping the
/// returned future drops every in-flight sub-batch with it.
pub async fn dispatch<'a, T, F, Fut>(items: &'a [T], limit: usize, op: F) -> Vec<BatchResult>
where
    F: FnMut(&'a [T]) -> Fut,
    Fut: Future<Output = BatchResult>,
{
    debug_assert!(limit > 0, "batch limit must be positive");
    join_all(items.chunks(limit).map(op)).await
}

/// Fold per-sub-batch outcomes into a single result covering `total` positions.
///
/// If every sub-batch succeeded this returns `Ok(())` without allocating.
/// Otherwise the result is always positional: a whole-batch error is copied
/// into every position of its sub-batch, positional errors land at their
/// global offsets.
pub fn group_errors(outcomes: Vec<BatchResult>, total: usize, limit: usize) -> BatchResult {
    if outcomes.iter().all(Result::is_ok) {
        return Ok(());
    }

    let mut grouped = MultiError::new(total);
    for (batch, outcome) in outcomes.into_iter().enumerate() {
        let lo = batch * limit;
        let hi = (lo + limit).min(total);
        let slots = &mut grouped.0[lo..hi];

        match outcome {
            Ok(()) => {}
            Err(BatchError::Single(err)) => {
                slots.iter_mut().for_each(|slot| *slot = Some(err.clone()));
            }
            Err(BatchError::Multi(multi)) => {
                let reported = multi.len();
                let expected = slots.len();
                if reported != expected {
                    tracing::warn!(
                        batch,
                        reported,
                        expected,
                        "store returned a positional error of the wrong length"
                    );
                }
                let mut entries = multi.into_inner().into_iter();
                for slot in slots.iter_mut() {
                    *slot = match entries.next() {
                        Some(entry) => entry,
                        None => Some(Error::Internal(format!(
                            "store reported {reported} results for {expected} keys"
                        ))),
                    };
                }
            }
        }
    }

    Err(BatchError::Multi(grouped))
}
