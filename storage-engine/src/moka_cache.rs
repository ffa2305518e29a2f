use async_trait::async_trait;
use bytes::Bytes;
use lockstep::{CacheItem, Cacher, Context};
use moka::Expiry;
use moka::future::Cache;
use shared::Result;
use std::fmt::Debug;
use std::time::{Duration, Instant};

/// What a cache entry holds: payload, flag bits and its own lifetime.
#[derive(Clone, Debug)]
struct CachedValue {
    value: Bytes,
    flags: u32,
    ttl: Option<Duration>,
}

/// Per-entry expiration: lock items live for their lock TTL, entries without
/// an expiration live until evicted.
struct ItemExpiry;

impl Expiry<String, CachedValue> for ItemExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// Moka-based cache tier
/// Provides a lock-free, concurrent in-process cache with per-item expiry
pub struct MokaCacher {
    cache: Cache<String, CachedValue>,
}

impl MokaCacher {
    /// Create a new unbounded Moka cache tier
    pub fn new_unbounded() -> Self {
        Self {
            cache: Cache::builder().expire_after(ItemExpiry).build(),
        }
    }

    /// Create a new bounded Moka cache tier with max entries
    pub fn new_bounded(max_entries: u64) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_entries)
                .expire_after(ItemExpiry)
                .build(),
        }
    }

    /// Create a Moka cache tier from name and optional capacity
    pub fn new(name: &str, max_entries: Option<u64>) -> Self {
        let mut builder = Cache::builder().name(name).expire_after(ItemExpiry);

        if let Some(capacity) = max_entries {
            builder = builder.max_capacity(capacity);
        }

        Self {
            cache: builder.build(),
        }
    }

    /// Look up a single entry, e.g. to check whether a key is currently locked.
    pub async fn get(&self, key: &str) -> Option<CacheItem> {
        let cached = self.cache.get(key).await?;
        Some(CacheItem {
            key: key.to_string(),
            value: cached.value,
            flags: cached.flags,
            expiration: cached.ttl,
        })
    }

    /// Number of live entries after pending evictions have been applied.
    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

#[async_trait]
impl Cacher for MokaCacher {
    async fn set_multi(&self, ctx: &Context, items: &[CacheItem]) -> Result<()> {
        ctx.check()?;
        for item in items {
            let cached = CachedValue {
                value: item.value.clone(),
                flags: item.flags,
                ttl: item.expiration,
            };
            self.cache.insert(item.key.clone(), cached).await;
        }
        Ok(())
    }

    async fn delete_multi(&self, ctx: &Context, keys: &[String]) -> Result<()> {
        ctx.check()?;
        for key in keys {
            self.cache.invalidate(key).await;
        }
        Ok(())
    }
}

impl Debug for MokaCacher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaCacher")
            .field("entry_count", &self.cache.entry_count())
            .field("weighted_size", &self.cache.weighted_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Error;
    use tokio::time::sleep;

    fn cancelled_context() -> Context {
        let ctx = Context::new();
        ctx.cancellation_token().cancel();
        ctx
    }

    #[tokio::test]
    async fn test_moka_cacher_set_and_get() {
        let cacher = MokaCacher::new("test", None);
        let ctx = Context::new();

        let item = CacheItem::entity("hello".to_string(), "world");
        cacher.set_multi(&ctx, &[item.clone()]).await.unwrap();

        let cached = cacher.get("hello").await.unwrap();
        assert_eq!(cached, item);
        assert!(!cached.is_lock());
    }

    #[tokio::test]
    async fn test_moka_cacher_delete() {
        let cacher = MokaCacher::new("test", None);
        let ctx = Context::new();

        let lock = CacheItem::lock("test_key".to_string(), Duration::from_secs(32));
        cacher.set_multi(&ctx, &[lock]).await.unwrap();
        cacher
            .delete_multi(&ctx, &["test_key".to_string()])
            .await
            .unwrap();

        assert!(cacher.get("test_key").await.is_none());
    }

    #[tokio::test]
    async fn test_moka_cacher_delete_missing_is_ok() {
        let cacher = MokaCacher::new_unbounded();
        let ctx = Context::new();
        let kept = CacheItem::lock("kept".to_string(), Duration::from_secs(32));
        cacher.set_multi(&ctx, &[kept]).await.unwrap();

        let missing = vec!["missing".to_string()];
        cacher.delete_multi(&ctx, &missing).await.unwrap();
        cacher.delete_multi(&ctx, &missing).await.unwrap();

        assert!(cacher.get("kept").await.is_some());
    }

    #[tokio::test]
    async fn test_moka_cacher_overwrite_lock_with_entity() {
        let cacher = MokaCacher::new_unbounded();
        let ctx = Context::new();

        let lock = CacheItem::lock("key".to_string(), Duration::from_secs(32));
        cacher.set_multi(&ctx, &[lock]).await.unwrap();
        let entity = CacheItem::entity("key".to_string(), "value2");
        cacher.set_multi(&ctx, &[entity]).await.unwrap();

        let cached = cacher.get("key").await.unwrap();
        assert!(!cached.is_lock());
        assert_eq!(cached.value, Bytes::from("value2"));
    }

    #[tokio::test]
    async fn test_moka_cacher_lock_expires() {
        let cacher = MokaCacher::new_unbounded();
        let ctx = Context::new();

        let lock = CacheItem::lock("lock".to_string(), Duration::from_millis(100));
        let entity = CacheItem::entity("entity".to_string(), "value");
        cacher.set_multi(&ctx, &[lock, entity]).await.unwrap();
        assert!(cacher.get("lock").await.is_some());

        // Wait for expiration
        sleep(Duration::from_millis(150)).await;

        assert!(cacher.get("lock").await.is_none());
        assert!(cacher.get("entity").await.is_some());
    }

    #[tokio::test]
    async fn test_moka_cacher_bounded() {
        let cacher = MokaCacher::new_bounded(2); // Max 2 entries
        let ctx = Context::new();

        let items: Vec<CacheItem> = (1..=3)
            .map(|i| CacheItem::entity(format!("key{i}"), "value"))
            .collect();
        cacher.set_multi(&ctx, &items).await.unwrap();

        assert!(cacher.entry_count().await <= 2, "Cache should have at most 2 entries");
    }

    #[tokio::test]
    async fn test_moka_cacher_honors_cancellation() {
        let cacher = MokaCacher::new_unbounded();
        let ctx = cancelled_context();

        let lock = CacheItem::lock("key".to_string(), Duration::from_secs(32));
        let result = cacher.set_multi(&ctx, &[lock]).await;

        assert_eq!(result, Err(Error::Cancelled));
        assert!(cacher.get("key").await.is_none());
    }
}
