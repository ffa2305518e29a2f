use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// What a cache tier does when writing lock items fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LockFailurePolicy {
    /// Abort the call and return the error before touching the store.
    #[default]
    FailFast,
    /// Report the error to the error sink and carry on to the store call.
    BestEffort,
}

impl FromStr for LockFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail-fast" | "fail_fast" | "failfast" => Ok(LockFailurePolicy::FailFast),
            "best-effort" | "best_effort" | "besteffort" => Ok(LockFailurePolicy::BestEffort),
            other => Err(format!("unknown lock failure policy '{other}'")),
        }
    }
}

pub struct Config {
    pub max_batch: usize,
    pub lock_ttl: Duration,
    pub cache_prefix: String,
    pub tier1_policy: LockFailurePolicy,
    pub tier2_enabled: bool,
    pub tier2_policy: LockFailurePolicy,
    pub cache_capacity: Option<u64>,
}

impl Config {
    /// Hard per-call item limit of the underlying store.
    pub const MAX_BATCH: usize = 500;
    /// How long a lock item survives in the cache if nobody releases it.
    pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(32);
    pub const DEFAULT_CACHE_PREFIX: &'static str = "LS1:";

    pub fn from_env() -> Self {
        let max_batch = parse_env("LOCKSTEP_MAX_BATCH", Self::MAX_BATCH);
        let max_batch = if max_batch == 0 || max_batch > Self::MAX_BATCH {
            warn!(
                "LOCKSTEP_MAX_BATCH={} is outside 1..={}, using {}",
                max_batch,
                Self::MAX_BATCH,
                Self::MAX_BATCH
            );
            Self::MAX_BATCH
        } else {
            max_batch
        };

        let lock_ttl_secs = parse_env("LOCKSTEP_LOCK_TTL_SECS", Self::DEFAULT_LOCK_TTL.as_secs());

        Self {
            max_batch,
            lock_ttl: Self::checked_lock_ttl(Duration::from_secs(lock_ttl_secs)),
            cache_prefix: std::env::var("LOCKSTEP_CACHE_PREFIX")
                .unwrap_or_else(|_| Self::DEFAULT_CACHE_PREFIX.to_string()),
            tier1_policy: parse_env("LOCKSTEP_TIER1_POLICY", LockFailurePolicy::FailFast),
            tier2_enabled: parse_env("LOCKSTEP_TIER2_ENABLED", false),
            tier2_policy: parse_env("LOCKSTEP_TIER2_POLICY", LockFailurePolicy::FailFast),
            cache_capacity: std::env::var("LOCKSTEP_CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.parse::<u64>().ok()),
        }
    }

    /// A lock that expires on write guards nothing, so a zero lifetime falls
    /// back to the default.
    pub fn checked_lock_ttl(ttl: Duration) -> Duration {
        if ttl.is_zero() {
            warn!(
                "lock TTL of zero is not allowed, using {}s",
                Self::DEFAULT_LOCK_TTL.as_secs()
            );
            Self::DEFAULT_LOCK_TTL
        } else {
            ttl
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_batch: Self::MAX_BATCH,
            lock_ttl: Self::DEFAULT_LOCK_TTL,
            cache_prefix: Self::DEFAULT_CACHE_PREFIX.to_string(),
            tier1_policy: LockFailurePolicy::default(),
            tier2_enabled: false,
            tier2_policy: LockFailurePolicy::default(),
            cache_capacity: None,
        }
    }
}

fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(name) {
        Ok(raw) => raw.parse::<T>().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using the default", name, raw);
            default
        }),
        Err(_) => default,
    }
}
