use crate::locks::{CacheTier, LockProtocol};
use crate::naming::{NamespacedKeyNamer, PrefixedKeyNamer};
use crate::ports::{CacheKeyNamer, Cacher, Datastore, ErrorSink};
use crate::sink::TracingErrorSink;
use shared::config::{Config, LockFailurePolicy};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

#[cfg(test)]
use crate::mutate::MutateHook;

/// Cache-consistent front for a [`Datastore`].
///
/// Deletes and mutations lock the affected keys in every configured cache
/// tier before the store is touched. Cloning is cheap; clones share the same
/// store and tiers.
#[derive(Clone)]
pub struct Client {
    pub(crate) store: Arc<dyn Datastore>,
    pub(crate) locks: LockProtocol,
    pub(crate) max_batch: usize,
    #[cfg(test)]
    pub(crate) mutate_hook: Option<Arc<dyn MutateHook>>,
}

impl Client {
    pub fn builder(store: Arc<dyn Datastore>) -> ClientBuilder {
        ClientBuilder::new(store)
    }

    /// A client with a single fail-fast cache tier and default naming.
    pub fn new(store: Arc<dyn Datastore>, cacher: Arc<dyn Cacher>) -> Self {
        ClientBuilder::new(store).with_cacher(cacher).build()
    }

    pub fn max_batch(&self) -> usize {
        self.max_batch
    }
}

impl Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("locks", &self.locks)
            .field("max_batch", &self.max_batch)
            .finish()
    }
}

/// Builder for [`Client`]. Both cache tiers are optional.
pub struct ClientBuilder {
    store: Arc<dyn Datastore>,
    cacher: Option<Arc<dyn Cacher>>,
    cacher2: Option<Arc<dyn Cacher>>,
    namer: Option<Arc<dyn CacheKeyNamer>>,
    namer2: Option<Arc<dyn CacheKeyNamer>>,
    policy: LockFailurePolicy,
    policy2: LockFailurePolicy,
    sink: Arc<dyn ErrorSink>,
    max_batch: usize,
    lock_ttl: Duration,
    cache_prefix: String,
    #[cfg(test)]
    mutate_hook: Option<Arc<dyn MutateHook>>,
}

impl ClientBuilder {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self {
            store,
            cacher: None,
            cacher2: None,
            namer: None,
            namer2: None,
            policy: LockFailurePolicy::default(),
            policy2: LockFailurePolicy::default(),
            sink: Arc::new(TracingErrorSink),
            max_batch: Config::MAX_BATCH,
            lock_ttl: Config::DEFAULT_LOCK_TTL,
            cache_prefix: Config::DEFAULT_CACHE_PREFIX.to_string(),
            #[cfg(test)]
            mutate_hook: None,
        }
    }

    /// Apply batch size, lock lifetime, key prefix and tier policies from config.
    /// Cache backends still have to be supplied with `with_cacher`.
    pub fn with_config(mut self, config: &Config) -> Self {
        self.max_batch = config.max_batch;
        self.lock_ttl = Config::checked_lock_ttl(config.lock_ttl);
        self.cache_prefix = config.cache_prefix.clone();
        self.policy = config.tier1_policy;
        self.policy2 = config.tier2_policy;
        self
    }

    pub fn with_cacher(mut self, cacher: Arc<dyn Cacher>) -> Self {
        self.cacher = Some(cacher);
        self
    }

    pub fn with_second_cacher(mut self, cacher: Arc<dyn Cacher>) -> Self {
        self.cacher2 = Some(cacher);
        self
    }

    pub fn with_key_namer(mut self, namer: Arc<dyn CacheKeyNamer>) -> Self {
        self.namer = Some(namer);
        self
    }

    pub fn with_second_key_namer(mut self, namer: Arc<dyn CacheKeyNamer>) -> Self {
        self.namer2 = Some(namer);
        self
    }

    pub fn with_lock_policy(mut self, policy: LockFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_second_lock_policy(mut self, policy: LockFailurePolicy) -> Self {
        self.policy2 = policy;
        self
    }

    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Clamped to the store's hard limit.
    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch.clamp(1, Config::MAX_BATCH);
        self
    }

    /// A zero lifetime is replaced by the default.
    pub fn with_lock_ttl(mut self, ttl: Duration) -> Self {
        self.lock_ttl = Config::checked_lock_ttl(ttl);
        self
    }

    pub fn with_cache_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cache_prefix = prefix.into();
        self
    }

    #[cfg(test)]
    pub(crate) fn with_mutate_hook(mut self, hook: Arc<dyn MutateHook>) -> Self {
        self.mutate_hook = Some(hook);
        self
    }

    pub fn build(self) -> Client {
        let mut tiers = Vec::with_capacity(2);

        if let Some(cacher) = self.cacher {
            let namer: Arc<dyn CacheKeyNamer> = match self.namer {
                Some(namer) => namer,
                None => Arc::new(PrefixedKeyNamer::new(self.cache_prefix.clone())),
            };
            tiers.push(CacheTier::new("cacher1", cacher, namer, self.policy));
        }
        if let Some(cacher) = self.cacher2 {
            let namer: Arc<dyn CacheKeyNamer> = match self.namer2 {
                Some(namer) => namer,
                None => Arc::new(NamespacedKeyNamer::new(self.cache_prefix.clone())),
            };
            tiers.push(CacheTier::new("cacher2", cacher, namer, self.policy2));
        }

        Client {
            store: self.store,
            locks: LockProtocol::new(tiers, self.sink, self.lock_ttl),
            max_batch: self.max_batch.clamp(1, Config::MAX_BATCH),
            #[cfg(test)]
            mutate_hook: self.mutate_hook,
        }
    }
}
