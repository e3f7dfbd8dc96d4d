// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod lifecycle;
pub mod listing;
pub mod metrics;
pub mod moderation;
pub mod promotion;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState, Crawler};
pub use crate::error::{RunError, StoreError, ValidationError, WorkflowError};
pub use crate::ingest::{run_once, RunOptions, RunSummary, SourceGroup};
pub use crate::lifecycle::Lifecycle;
pub use crate::listing::{BannerLocation, ListingItem, ListingType, RunLog, RunStatus};
pub use crate::store::{JsonFileRepository, MemoryRepository, Repository};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_LOG_FILTER: &str =
    "listing_curator=info,ingest=info,moderation=info,promotion=info,api=info,warn";

/// Install the global subscriber: `RUST_LOG` or [`DEFAULT_LOG_FILTER`],
/// compact lines by default, JSON when `LOG_FORMAT=json`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    // a subscriber installed by the host runtime wins
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}
