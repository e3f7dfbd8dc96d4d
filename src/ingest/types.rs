// src/ingest/types.rs
use anyhow::Result;

use crate::listing::ListingType;

/// Unnormalized record as scraped. `link` may be relative.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct RawCandidate {
    pub title: String,
    pub link: String,
    pub date_text: Option<String>,
    pub description: Option<String>,
    pub company: Option<String>,    // jobs
    pub location: Option<String>,   // jobs, events
    pub prize_text: Option<String>, // contests
}

/// Who a candidate came from and how relative links resolve.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub name: String,
    pub base_url: String,
    pub listing_type: ListingType,
}

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    /// One bounded fetch + parse. Errors are soft: the orchestrator logs and moves on.
    async fn fetch_latest(&self) -> Result<Vec<RawCandidate>>;
    fn descriptor(&self) -> &SourceDescriptor;

    fn name(&self) -> &str {
        &self.descriptor().name
    }
}
