use crate::context::Context;
use crate::domain::{CacheItem, Key, Mutation};
use crate::ports::{Cacher, Datastore, ErrorSink};
use async_trait::async_trait;
use shared::{BatchResult, Error, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub(crate) struct MapCacher {
    pub items: Mutex<HashMap<String, CacheItem>>,
    pub fail_writes: bool,
}

impl MapCacher {
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }
}

#[async_trait]
impl Cacher for MapCacher {
    async fn set_multi(&self, _ctx: &Context, items: &[CacheItem]) -> Result<()> {
        if self.fail_writes {
            return Err(Error::Cache("write refused".into()));
        }
        let mut map = self.items.lock().unwrap();
        for item in items {
            map.insert(item.key.clone(), item.clone());
        }
        Ok(())
    }

    async fn delete_multi(&self, _ctx: &Context, keys: &[String]) -> Result<()> {
        let mut map = self.items.lock().unwrap();
        for key in keys {
            map.remove(key);
        }
        Ok(())
    }
}

/// Store that accepts everything and counts calls.
#[derive(Default)]
pub(crate) struct CountingStore {
    pub deletes: AtomicUsize,
    pub mutates: AtomicUsize,
}

#[async_trait]
impl Datastore for CountingStore {
    async fn delete_multi(&self, _ctx: &Context, _keys: &[Key]) -> BatchResult {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn mutate(&self, _ctx: &Context, mutations: &[Mutation]) -> BatchResult<Vec<Key>> {
        self.mutates.fetch_add(1, Ordering::SeqCst);
        Ok(mutations.iter().map(|m| m.key().clone()).collect())
    }
}

pub(crate) fn collecting_sink() -> (Arc<Mutex<Vec<Error>>>, Arc<dyn ErrorSink>) {
    let reports = Arc::new(Mutex::new(Vec::new()));
    let sink_reports = reports.clone();
    let sink = move |_: &Context, err: Error| sink_reports.lock().unwrap().push(err);
    (reports, Arc::new(sink))
}
