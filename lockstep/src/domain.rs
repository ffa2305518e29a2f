use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The identifying part of a key: either a string name or a numeric id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyId {
    Name(String),
    Id(i64),
}

/// A store-level key. Keys form a path through their parents and may live in
/// a namespace.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
    pub kind: String,
    pub id: KeyId,
    pub parent: Option<Box<Key>>,
    pub namespace: Option<String>,
}

impl Key {
    pub fn name(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: KeyId::Name(name.into()),
            parent: None,
            namespace: None,
        }
    }

    pub fn id(kind: impl Into<String>, id: i64) -> Self {
        Self {
            kind: kind.into(),
            id: KeyId::Id(id),
            parent: None,
            namespace: None,
        }
    }

    pub fn with_parent(mut self, parent: Key) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Canonical, unambiguous encoding of the full key path, root first.
    ///
    /// Every variable-length component is length-prefixed so that kinds or
    /// names containing separators cannot collide.
    pub fn encode(&self) -> String {
        let mut path = Vec::new();
        let mut cursor = Some(self);
        while let Some(key) = cursor {
            path.push(key);
            cursor = key.parent.as_deref();
        }

        let mut out = String::new();
        if let Some(ns) = &self.namespace {
            out.push_str(&format!("{}:{}|", ns.len(), ns));
        }
        for (i, key) in path.iter().rev().enumerate() {
            if i > 0 {
                out.push('/');
            }
            out.push_str(&format!("{}:{}", key.kind.len(), key.kind));
            match &key.id {
                KeyId::Name(name) => out.push_str(&format!("n{}:{}", name.len(), name)),
                KeyId::Id(id) => out.push_str(&format!("i{id}")),
            }
        }
        out
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parent) = &self.parent {
            write!(f, "{parent}/")?;
        }
        match &self.id {
            KeyId::Name(name) => write!(f, "{},{:?}", self.kind, name),
            KeyId::Id(id) => write!(f, "{},{}", self.kind, id),
        }
    }
}

/// A typed store mutation.
///
/// Insert only succeeds for new keys, Update only for existing ones, Upsert
/// behaves like a plain put and Delete removes the entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    Insert(Key, Bytes),
    Upsert(Key, Bytes),
    Update(Key, Bytes),
    Delete(Key),
}

impl Mutation {
    pub fn insert(key: Key, payload: impl Into<Bytes>) -> Self {
        Mutation::Insert(key, payload.into())
    }

    pub fn upsert(key: Key, payload: impl Into<Bytes>) -> Self {
        Mutation::Upsert(key, payload.into())
    }

    pub fn update(key: Key, payload: impl Into<Bytes>) -> Self {
        Mutation::Update(key, payload.into())
    }

    pub fn delete(key: Key) -> Self {
        Mutation::Delete(key)
    }

    pub fn key(&self) -> &Key {
        match self {
            Mutation::Insert(key, _)
            | Mutation::Upsert(key, _)
            | Mutation::Update(key, _)
            | Mutation::Delete(key) => key,
        }
    }

    /// Whether the cache lock guarding this mutation is removed once the store
    /// call returns. Deletes keep theirs as a tombstone.
    pub fn releases_lock(&self) -> bool {
        !matches!(self, Mutation::Delete(_))
    }
}

/// Flag bits carried by every cache item so readers can tell payloads from locks.
pub mod flags {
    pub const ENTITY: u32 = 1;
    pub const LOCK: u32 = 2;
}

/// An entry written to a cache tier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheItem {
    pub key: String,
    pub value: Bytes,
    pub flags: u32,
    pub expiration: Option<Duration>,
}

impl CacheItem {
    /// A lock sentinel: random value, `LOCK` flag, bounded lifetime.
    pub fn lock(key: String, ttl: Duration) -> Self {
        let value: [u8; 4] = rand::random();
        Self {
            key,
            value: Bytes::copy_from_slice(&value),
            flags: flags::LOCK,
            expiration: Some(ttl),
        }
    }

    pub fn entity(key: String, value: impl Into<Bytes>) -> Self {
        Self {
            key,
            value: value.into(),
            flags: flags::ENTITY,
            expiration: None,
        }
    }

    pub fn is_lock(&self) -> bool {
        self.flags & flags::LOCK != 0
    }
}
