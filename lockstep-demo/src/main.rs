use lockstep::{BatchError, BatchResult, Client, Context, Key, Mutation};
use serde::Serialize;
use shared::config::Config;
use std::sync::Arc;
use storage_engine::{MemoryDatastore, MokaCacher};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_KEY_COUNT: usize = 1200;
const SAMPLE_ERRORS: usize = 5;

#[derive(Serialize)]
struct Report {
    seeded: usize,
    mutate: Outcome,
    produced_keys: Vec<Key>,
    delete: Outcome,
    tier1_entries: u64,
    tier2_entries: Option<u64>,
}

#[derive(Serialize)]
struct Outcome {
    ok: bool,
    failed: usize,
    errors: Vec<(usize, String)>,
}

impl Outcome {
    fn from_result<T>(result: &BatchResult<T>) -> Self {
        match result {
            Ok(_) => Self {
                ok: true,
                failed: 0,
                errors: Vec::new(),
            },
            Err(BatchError::Single(err)) => Self {
                ok: false,
                failed: 0,
                errors: vec![(0, err.to_string())],
            },
            Err(BatchError::Multi(multi)) => Self {
                ok: false,
                failed: multi.failure_count(),
                errors: multi
                    .failures()
                    .take(SAMPLE_ERRORS)
                    .map(|(i, e)| (i, e.to_string()))
                    .collect(),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load environment variables
    match dotenvy::dotenv() {
        Ok(_) => info!("Loaded environment variables from .env file"),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    let config = Config::from_env();
    let key_count = match std::env::args().nth(1) {
        Some(raw) => raw.parse::<usize>()?,
        None => DEFAULT_KEY_COUNT,
    };

    let store = MemoryDatastore::new();
    let tier1 = Arc::new(MokaCacher::new("tier1", config.cache_capacity));
    let tier2 = config
        .tier2_enabled
        .then(|| Arc::new(MokaCacher::new("tier2", config.cache_capacity)));

    let mut builder = Client::builder(Arc::new(store.clone()))
        .with_config(&config)
        .with_cacher(tier1.clone());
    if let Some(tier2) = &tier2 {
        builder = builder.with_second_cacher(tier2.clone());
    }
    let client = builder.build();
    info!(?client, key_count, "client ready");

    let token = CancellationToken::new();
    let ctx = Context::with_cancellation(token.clone()).with_namespace("demo");
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling in-flight calls");
            token.cancel();
        }
    });

    // Seed the store one store-sized call at a time.
    let keys: Vec<Key> = (0..key_count as i64).map(|i| Key::id("Entity", i)).collect();
    for chunk in keys.chunks(config.max_batch) {
        let seed: Vec<Mutation> = chunk
            .iter()
            .map(|k| Mutation::upsert(k.clone(), format!("payload-{k}")))
            .collect();
        client.mutate(&ctx, &seed).await?;
    }
    info!(seeded = store.len().await, "store seeded");

    // One of each mutation kind; the insert collides with a seeded key.
    let mixed = vec![
        Mutation::insert(Key::id("Entity", 0), "duplicate"),
        Mutation::update(Key::id("Entity", 1), "updated"),
        Mutation::upsert(Key::name("Entity", "extra"), "upserted"),
        Mutation::delete(Key::id("Entity", 2)),
    ];
    let mutated = client.mutate(&ctx, &mixed).await;
    let mutate = Outcome::from_result(&mutated);
    let produced_keys = mutated.unwrap_or_default();

    let deleted = client.delete_multi(&ctx, &keys).await;
    let delete = Outcome::from_result(&deleted);

    let tier2_entries = match &tier2 {
        Some(tier2) => Some(tier2.entry_count().await),
        None => None,
    };
    let report = Report {
        seeded: key_count,
        mutate,
        produced_keys,
        delete,
        tier1_entries: tier1.entry_count().await,
        tier2_entries,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
