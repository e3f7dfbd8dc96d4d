//! Listing curator service: binary entrypoint.
//! Boots the Axum HTTP server with the JSON-file repository, the source catalogue
//! and the Prometheus `/metrics` route.

use std::sync::Arc;

use anyhow::Context;
use listing_curator::config::Settings;
use listing_curator::ingest::config::load_sources_default;
use listing_curator::metrics::Metrics;
use listing_curator::{router, AppState, Crawler, JsonFileRepository};
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    listing_curator::init_tracing();

    let settings = Settings::from_env()?;
    let repo = JsonFileRepository::open(&settings.store_path)
        .with_context(|| format!("opening store {}", settings.store_path.display()))?;
    let catalogue = load_sources_default()?;
    tracing::info!(
        target: "api",
        store = %settings.store_path.display(),
        groups = ?catalogue.group_names(),
        "starting"
    );

    let metrics = Metrics::init()?;
    let state = AppState::new(Arc::new(repo), Crawler::new(catalogue, settings)?);
    let app = router(state).merge(metrics.router());

    Ok(app.into())
}
