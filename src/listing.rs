//! # Listing model
//!
//! Canonical record shared by every stage of the pipeline, plus the run-log row the
//! orchestrator writes once per invocation.
//!
//! Moderation and banner state is persisted as plain flags so that simple filtered
//! reads stay cheap; [`crate::lifecycle::Lifecycle`] is the validated view over them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    Job,
    Contest,
    Event,
}

impl ListingType {
    pub fn as_str(self) -> &'static str {
        match self {
            ListingType::Job => "job",
            ListingType::Contest => "contest",
            ListingType::Event => "event",
        }
    }
}

impl FromStr for ListingType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "job" | "jobs" => Ok(ListingType::Job),
            "contest" | "contests" => Ok(ListingType::Contest),
            "event" | "events" => Ok(ListingType::Event),
            other => anyhow::bail!("unknown listing type: {other}"),
        }
    }
}

/// Page slot a banner is placed on. `Both` shows on discover and recruit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerLocation {
    Discover,
    Recruit,
    Both,
}

impl BannerLocation {
    /// True when a banner placed at `self` is shown on `page`.
    pub fn shows_on(self, page: BannerLocation) -> bool {
        self == BannerLocation::Both || self == page
    }

    /// True when two placements share at least one page.
    pub fn overlaps(self, other: BannerLocation) -> bool {
        self == BannerLocation::Both || other == BannerLocation::Both || self == other
    }
}

impl FromStr for BannerLocation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discover" => Ok(BannerLocation::Discover),
            "recruit" => Ok(BannerLocation::Recruit),
            "both" => Ok(BannerLocation::Both),
            other => anyhow::bail!("unknown banner location: {other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingItem {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: ListingType,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub link: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub prize: Option<String>,
    pub deadline: NaiveDate,
    pub source: String,
    pub crawled_at: DateTime<Utc>,

    #[serde(default)]
    pub is_approved: bool,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub approved_by: Option<String>,

    #[serde(default)]
    pub show_as_banner: bool,
    #[serde(default)]
    pub banner_location: Option<BannerLocation>,
    #[serde(default)]
    pub banner_priority: i64,
}

impl ListingItem {
    /// Build a fresh pending item. Moderation and banner fields start cleared.
    pub fn pending(
        item_type: ListingType,
        title: String,
        link: String,
        deadline: NaiveDate,
        source: String,
        crawled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: listing_id(&title, &link),
            item_type,
            title,
            description: None,
            link,
            company: None,
            location: None,
            prize: None,
            deadline,
            source,
            crawled_at,
            is_approved: false,
            is_active: false,
            approved_at: None,
            approved_by: None,
            show_as_banner: false,
            banner_location: None,
            banner_priority: 0,
        }
    }

    pub fn is_published(&self) -> bool {
        self.is_approved && self.is_active
    }

    /// Flag invariants: active implies approved, banner implies approved and active.
    pub fn flags_consistent(&self) -> bool {
        (!self.is_active || self.is_approved)
            && (!self.show_as_banner || (self.is_approved && self.is_active))
    }
}

/// Stable id for a logical `(title, link)` pair: hex of the first 16 SHA-256 bytes.
pub fn listing_id(title: &str, link: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update([0u8]);
    hasher.update(link.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(32);
    for b in digest.iter().take(16) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Error,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Success => f.write_str("success"),
            RunStatus::Error => f.write_str("error"),
        }
    }
}

/// One row per orchestrator invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLog {
    pub source_group: String,
    pub status: RunStatus,
    pub items_found: usize,
    pub items_added: usize,
    #[serde(default)]
    pub items_skipped: usize,
    #[serde(default)]
    pub items_rejected: usize,
    #[serde(default)]
    pub adapter_failures: usize,
    #[serde(default)]
    pub error_message: Option<String>,
    pub duration_ms: u64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_stable_and_separates_fields() {
        let a = listing_id("A", "http://x/1");
        assert_eq!(a, listing_id("A", "http://x/1"));
        assert_eq!(a.len(), 32);
        // "ab" + "c" must not collide with "a" + "bc"
        assert_ne!(listing_id("ab", "c"), listing_id("a", "bc"));
    }

    #[test]
    fn both_shows_everywhere() {
        assert!(BannerLocation::Both.shows_on(BannerLocation::Discover));
        assert!(BannerLocation::Both.shows_on(BannerLocation::Recruit));
        assert!(!BannerLocation::Discover.shows_on(BannerLocation::Recruit));
        assert!(BannerLocation::Recruit.overlaps(BannerLocation::Both));
        assert!(!BannerLocation::Recruit.overlaps(BannerLocation::Discover));
    }

    #[test]
    fn serde_uses_type_key_and_lowercase_enums() {
        let now = Utc::now();
        let item = ListingItem::pending(
            ListingType::Contest,
            "T".into(),
            "https://x/1".into(),
            NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            "src".into(),
            now,
        );
        let v = serde_json::to_value(&item).unwrap();
        assert_eq!(v["type"], "contest");
        assert_eq!(v["deadline"], "2026-01-31");
        assert_eq!(v["is_approved"], false);
    }

    #[test]
    fn parse_type_accepts_group_names() {
        assert_eq!("jobs".parse::<ListingType>().unwrap(), ListingType::Job);
        assert_eq!("Contest".parse::<ListingType>().unwrap(), ListingType::Contest);
        assert!("webinar".parse::<ListingType>().is_err());
    }
}
