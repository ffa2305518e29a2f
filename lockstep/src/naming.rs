use crate::context::Context;
use crate::domain::Key;
use crate::ports::CacheKeyNamer;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Names cache entries as `prefix + base64url(key.encode())`.
#[derive(Clone, Debug)]
pub struct PrefixedKeyNamer {
    prefix: String,
}

impl PrefixedKeyNamer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl CacheKeyNamer for PrefixedKeyNamer {
    fn cache_key(&self, _ctx: &Context, key: &Key) -> String {
        format!("{}{}", self.prefix, URL_SAFE_NO_PAD.encode(key.encode()))
    }
}

/// Like [`PrefixedKeyNamer`], but scoped by the namespace carried in the call
/// context. Meant for a second tier shared between deployments.
#[derive(Clone, Debug)]
pub struct NamespacedKeyNamer {
    inner: PrefixedKeyNamer,
}

impl NamespacedKeyNamer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            inner: PrefixedKeyNamer::new(prefix),
        }
    }
}

impl CacheKeyNamer for NamespacedKeyNamer {
    fn cache_key(&self, ctx: &Context, key: &Key) -> String {
        let name = self.inner.cache_key(ctx, key);
        match ctx.namespace() {
            Some(ns) => format!("{}:{}", URL_SAFE_NO_PAD.encode(ns), name),
            None => name,
        }
    }
}
