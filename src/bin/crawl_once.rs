//! Run the ingestion pipeline once from the command line (cron / external scheduler).
//!
//! Usage: `crawl_once [GROUP]`. Prints the run summary as JSON; exits non-zero when the
//! run aborted.

use anyhow::Context;
use listing_curator::config::Settings;
use listing_curator::ingest::config::load_sources_default;
use listing_curator::ingest::providers::build_http_client;
use listing_curator::{run_once, JsonFileRepository};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    listing_curator::init_tracing();

    let group = std::env::args().nth(1);
    let settings = Settings::from_env()?;
    let repo = JsonFileRepository::open(&settings.store_path)
        .with_context(|| format!("opening store {}", settings.store_path.display()))?;
    let catalogue = load_sources_default()?;
    let client = build_http_client(settings.fetch_timeout)?;
    let groups = catalogue.build_groups(group.as_deref(), &settings, &client)?;

    let summary = run_once(&repo, &groups, &settings.run_options()).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
