// src/ingest/providers/mod.rs
//! Source adapters: a closed set of variants behind [`SourceProvider`].
//!
//! Every adapter fetches through [`Fetch`], which is either an in-memory fixture or a
//! single bounded HTTP GET with an injected client.

pub mod api;
pub mod markup;

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;

use crate::ingest::types::{RawCandidate, SourceDescriptor, SourceProvider};
use crate::listing::ListingType;

pub use api::{ApiAdapter, ApiFormat, ApiSpec, FieldMap};
pub use markup::{MarkupAdapter, MarkupSpec};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_ITEMS: usize = 10;

const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 ",
    "(KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
);

/// Build the HTTP client adapters share within one run.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .context("building source http client")
}

/// Where an adapter's body comes from.
pub enum Fetch {
    Fixture(String),
    Http {
        url: String,
        client: reqwest::Client,
        timeout: Duration,
    },
}

impl Fetch {
    pub fn fixture(body: &str) -> Self {
        Fetch::Fixture(body.to_string())
    }

    pub fn http(url: impl Into<String>, client: reqwest::Client, timeout: Duration) -> Self {
        Fetch::Http {
            url: url.into(),
            client,
            timeout,
        }
    }

    /// One GET; timeout, transport errors and non-2xx statuses are all errors.
    pub async fn body(&self, provider: &str) -> Result<String> {
        match self {
            Fetch::Fixture(s) => Ok(s.clone()),
            Fetch::Http {
                url,
                client,
                timeout,
            } => {
                let resp = client
                    .get(url)
                    .timeout(*timeout)
                    .send()
                    .await
                    .with_context(|| format!("{provider}: GET {url}"))?;
                let status = resp.status();
                if !status.is_success() {
                    anyhow::bail!("{provider}: HTTP {status} for {url}");
                }
                resp.text()
                    .await
                    .with_context(|| format!("{provider}: reading body of {url}"))
            }
        }
    }
}

/// Record parse telemetry for one adapter invocation.
pub(crate) fn record_parse(t0: std::time::Instant, yielded: usize, skipped: usize) {
    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("ingest_parse_ms").record(ms);
    counter!("ingest_candidates_total").increment(yielded as u64);
    if skipped > 0 {
        counter!("ingest_malformed_total").increment(skipped as u64);
    }
}

/// Per-source adapter configuration, tagged by family.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AdapterSpec {
    Markup(MarkupSpec),
    Api(ApiSpec),
}

/// One entry of the source catalogue.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSpec {
    pub name: String,
    pub base_url: String,
    /// Page or endpoint to fetch; defaults to `base_url`.
    #[serde(default)]
    pub fetch_url: Option<String>,
    pub listing_type: ListingType,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub adapter: AdapterSpec,
}

fn default_enabled() -> bool {
    true
}

impl SourceSpec {
    pub fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor {
            name: self.name.clone(),
            base_url: self.base_url.clone(),
            listing_type: self.listing_type,
        }
    }

    pub fn fetch_url(&self) -> &str {
        self.fetch_url.as_deref().unwrap_or(&self.base_url)
    }

    /// Check what can be checked without fetching: markup selectors must compile.
    pub fn validate(&self) -> Result<()> {
        match &self.adapter {
            AdapterSpec::Markup(m) => m
                .validate()
                .with_context(|| format!("source {:?} has a bad selector", self.name)),
            AdapterSpec::Api(_) => Ok(()),
        }
    }
}

pub enum SourceAdapter {
    Markup(MarkupAdapter),
    Api(ApiAdapter),
}

impl SourceAdapter {
    /// Build an adapter from its spec. Bad selectors fail here, not mid-run.
    pub fn from_spec(spec: &SourceSpec, fetch: Fetch, max_items: usize) -> Result<Self> {
        let desc = spec.descriptor();
        Ok(match &spec.adapter {
            AdapterSpec::Markup(m) => {
                SourceAdapter::Markup(MarkupAdapter::new(desc, m, fetch, max_items)?)
            }
            AdapterSpec::Api(a) => {
                SourceAdapter::Api(ApiAdapter::new(desc, a.clone(), fetch, max_items))
            }
        })
    }
}

#[async_trait]
impl SourceProvider for SourceAdapter {
    async fn fetch_latest(&self) -> Result<Vec<RawCandidate>> {
        match self {
            SourceAdapter::Markup(a) => a.fetch_latest().await,
            SourceAdapter::Api(a) => a.fetch_latest().await,
        }
    }

    fn descriptor(&self) -> &SourceDescriptor {
        match self {
            SourceAdapter::Markup(a) => a.descriptor(),
            SourceAdapter::Api(a) => a.descriptor(),
        }
    }
}
