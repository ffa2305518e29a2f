#![allow(dead_code)]

use async_trait::async_trait;
use lockstep::{
    BatchError, BatchResult, CacheItem, Cacher, Context, Datastore, Error, ErrorSink, Key,
    MultiError, Mutation, Result,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Everything the fakes observed, in the order it happened.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    CacheSet { tier: &'static str, keys: Vec<String> },
    CacheDelete { tier: &'static str, keys: Vec<String> },
    StoreDelete { keys: Vec<Key> },
    StoreMutate { keys: Vec<Key> },
}

#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Event>>>);

impl Journal {
    pub fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn store_deletes(&self) -> Vec<Vec<Key>> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::StoreDelete { keys } => Some(keys),
                _ => None,
            })
            .collect()
    }

    pub fn store_mutates(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::StoreMutate { .. }))
            .count()
    }
}

pub struct RecordingCache {
    tier: &'static str,
    journal: Journal,
    items: Mutex<HashMap<String, CacheItem>>,
    pub fail_sets: AtomicBool,
    pub fail_deletes: AtomicBool,
}

impl RecordingCache {
    pub fn new(tier: &'static str, journal: Journal) -> Self {
        Self {
            tier,
            journal,
            items: Mutex::new(HashMap::new()),
            fail_sets: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        }
    }

    pub fn failing_sets(self) -> Self {
        self.fail_sets.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_deletes(self) -> Self {
        self.fail_deletes.store(true, Ordering::SeqCst);
        self
    }

    pub fn item(&self, cache_key: &str) -> Option<CacheItem> {
        self.items.lock().unwrap().get(cache_key).cloned()
    }

    pub fn lock_count(&self) -> usize {
        self.items
            .lock()
            .unwrap()
            .values()
            .filter(|item| item.is_lock())
            .count()
    }
}

#[async_trait]
impl Cacher for RecordingCache {
    async fn set_multi(&self, _ctx: &Context, items: &[CacheItem]) -> Result<()> {
        if self.fail_sets.load(Ordering::SeqCst) {
            return Err(Error::Cache(format!("{} unavailable", self.tier)));
        }
        let mut map = self.items.lock().unwrap();
        for item in items {
            map.insert(item.key.clone(), item.clone());
        }
        self.journal.push(Event::CacheSet {
            tier: self.tier,
            keys: items.iter().map(|i| i.key.clone()).collect(),
        });
        Ok(())
    }

    async fn delete_multi(&self, _ctx: &Context, keys: &[String]) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Error::Cache(format!("{} unavailable", self.tier)));
        }
        let mut map = self.items.lock().unwrap();
        for key in keys {
            map.remove(key);
        }
        self.journal.push(Event::CacheDelete {
            tier: self.tier,
            keys: keys.to_vec(),
        });
        Ok(())
    }
}

/// Store fake: fails chosen keys positionally, or every call with one error.
pub struct RecordingStore {
    journal: Journal,
    failing_keys: HashMap<Key, Error>,
    call_error: Option<Error>,
}

impl RecordingStore {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            failing_keys: HashMap::new(),
            call_error: None,
        }
    }

    pub fn failing_key(mut self, key: Key, err: Error) -> Self {
        self.failing_keys.insert(key, err);
        self
    }

    pub fn failing_calls(mut self, err: Error) -> Self {
        self.call_error = Some(err);
        self
    }

    fn outcome<'k>(&self, ctx: &Context, keys: impl Iterator<Item = &'k Key>) -> BatchResult {
        ctx.check()?;
        if let Some(err) = &self.call_error {
            return Err(BatchError::Single(err.clone()));
        }
        let errors: Vec<Option<Error>> = keys.map(|k| self.failing_keys.get(k).cloned()).collect();
        if errors.iter().any(Option::is_some) {
            return Err(BatchError::Multi(MultiError(errors)));
        }
        Ok(())
    }
}

#[async_trait]
impl Datastore for RecordingStore {
    async fn delete_multi(&self, ctx: &Context, keys: &[Key]) -> BatchResult {
        assert!(keys.len() <= 500, "store limit exceeded: {}", keys.len());
        self.journal.push(Event::StoreDelete {
            keys: keys.to_vec(),
        });
        self.outcome(ctx, keys.iter())
    }

    async fn mutate(&self, ctx: &Context, mutations: &[Mutation]) -> BatchResult<Vec<Key>> {
        self.journal.push(Event::StoreMutate {
            keys: mutations.iter().map(|m| m.key().clone()).collect(),
        });
        self.outcome(ctx, mutations.iter().map(Mutation::key))?;
        Ok(mutations.iter().map(|m| m.key().clone()).collect())
    }
}

#[derive(Clone, Default)]
pub struct CollectingSink(Arc<Mutex<Vec<Error>>>);

impl CollectingSink {
    pub fn reports(&self) -> Vec<Error> {
        self.0.lock().unwrap().clone()
    }
}

impl ErrorSink for CollectingSink {
    fn report(&self, _ctx: &Context, err: Error) {
        self.0.lock().unwrap().push(err);
    }
}

pub fn keys(n: usize) -> Vec<Key> {
    (0..n).map(|i| Key::id("Entity", i as i64)).collect()
}
