// src/config/mod.rs
//! Runtime settings read from the environment (call `dotenvy::dotenv()` first).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::ingest::dedup::DedupPolicy;
use crate::ingest::providers::{DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_ITEMS};
use crate::ingest::{RunOptions, DEFAULT_ADAPTER_DEADLINE, DEFAULT_INTER_ADAPTER_DELAY};

pub const ENV_STORE_PATH: &str = "LISTING_STORE_PATH";
pub const DEFAULT_STORE_PATH: &str = "data/listings.json";

#[derive(Debug, Clone)]
pub struct Settings {
    pub store_path: PathBuf,
    pub fetch_timeout: Duration,
    pub max_items_per_source: usize,
    pub inter_adapter_delay: Duration,
    pub adapter_deadline: Duration,
    pub dedup: DedupPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            max_items_per_source: DEFAULT_MAX_ITEMS,
            inter_adapter_delay: DEFAULT_INTER_ADAPTER_DELAY,
            adapter_deadline: DEFAULT_ADAPTER_DEADLINE,
            dedup: DedupPolicy::SkipExisting,
        }
    }
}

impl Settings {
    /// Unset variables take their defaults; set-but-unparseable ones are errors.
    pub fn from_env() -> Result<Self> {
        let d = Settings::default();
        let store_path = std::env::var(ENV_STORE_PATH)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(d.store_path);

        let fetch_timeout = env_u64("FETCH_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(d.fetch_timeout);
        let max_items_per_source = env_u64("MAX_ITEMS_PER_SOURCE")?
            .map(|n| n as usize)
            .unwrap_or(d.max_items_per_source);
        let inter_adapter_delay = env_u64("INTER_ADAPTER_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(d.inter_adapter_delay);
        let adapter_deadline = env_u64("ADAPTER_DEADLINE_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(d.adapter_deadline);
        let dedup = match std::env::var("DEDUP_POLICY") {
            Ok(v) if !v.trim().is_empty() => v.parse()?,
            _ => d.dedup,
        };

        if max_items_per_source == 0 {
            return Err(anyhow!("MAX_ITEMS_PER_SOURCE must be at least 1"));
        }
        if fetch_timeout.is_zero() || adapter_deadline.is_zero() {
            return Err(anyhow!("fetch timeout and adapter deadline must be non-zero"));
        }

        Ok(Self {
            store_path,
            fetch_timeout,
            max_items_per_source,
            inter_adapter_delay,
            adapter_deadline,
            dedup,
        })
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            inter_adapter_delay: self.inter_adapter_delay,
            adapter_deadline: self.adapter_deadline,
            dedup: self.dedup,
        }
    }
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| anyhow!("{key} must be a non-negative integer, got {v:?}")),
        _ => Ok(None),
    }
}
