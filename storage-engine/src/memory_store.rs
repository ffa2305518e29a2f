use async_trait::async_trait;
use bytes::Bytes;
use lockstep::{Context, Datastore, Key, Mutation};
use shared::config::Config;
use shared::{BatchError, BatchResult, Error, MultiError};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory, strongly-consistent keyed store.
///
/// Enforces the same per-call item limit as the remote store and applies a
/// mutation call atomically: if any mutation is rejected, none are applied.
#[derive(Clone, Default)]
pub struct MemoryDatastore {
    entities: Arc<RwLock<HashMap<Key, Bytes>>>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &Key) -> Option<Bytes> {
        self.entities.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entities.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entities.read().await.is_empty()
    }

    fn check_limit(count: usize) -> shared::Result<()> {
        if count > Config::MAX_BATCH {
            return Err(Error::InvalidArgument(format!(
                "{} items exceeds the limit of {} per call",
                count,
                Config::MAX_BATCH
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn delete_multi(&self, ctx: &Context, keys: &[Key]) -> BatchResult {
        ctx.check()?;
        Self::check_limit(keys.len())?;

        let mut entities = self.entities.write().await;
        for key in keys {
            entities.remove(key);
        }
        Ok(())
    }

    async fn mutate(&self, ctx: &Context, mutations: &[Mutation]) -> BatchResult<Vec<Key>> {
        ctx.check()?;
        Self::check_limit(mutations.len())?;

        let mut entities = self.entities.write().await;

        let mut seen = HashSet::with_capacity(mutations.len());
        let errors: Vec<Option<Error>> = mutations
            .iter()
            .map(|mutation| {
                let key = mutation.key();
                if !seen.insert(key) {
                    return Some(Error::InvalidArgument(format!(
                        "multiple mutations for {key}"
                    )));
                }
                match mutation {
                    Mutation::Insert(..) if entities.contains_key(key) => Some(Error::AlreadyExists),
                    Mutation::Update(..) if !entities.contains_key(key) => Some(Error::NoSuchEntity),
                    _ => None,
                }
            })
            .collect();

        if errors.iter().any(Option::is_some) {
            tracing::debug!(
                rejected = errors.iter().filter(|e| e.is_some()).count(),
                "mutation call rejected"
            );
            return Err(BatchError::Multi(MultiError(errors)));
        }

        for mutation in mutations {
            match mutation {
                Mutation::Insert(key, payload)
                | Mutation::Upsert(key, payload)
                | Mutation::Update(key, payload) => {
                    entities.insert(key.clone(), payload.clone());
                }
                Mutation::Delete(key) => {
                    entities.remove(key);
                }
            }
        }

        Ok(mutations.iter().map(|m| m.key().clone()).collect())
    }
}

impl std::fmt::Debug for MemoryDatastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDatastore")
            .field("entities", &"<RwLock<HashMap>>")
            .finish()
    }
}
