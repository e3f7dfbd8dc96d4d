// src/ingest/dedup.rs
//! Existence check before insert, keyed on exact `(title, link)`.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::listing::ListingItem;
use crate::store::Repository;

/// What to do with a candidate whose `(title, link)` is already stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Leave the stored row untouched.
    #[default]
    SkipExisting,
    /// Overwrite content fields (description, deadline, prize, company, location).
    /// Moderation and banner state is never touched.
    RefreshContent,
}

impl std::str::FromStr for DedupPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" | "skip_existing" => Ok(DedupPolicy::SkipExisting),
            "refresh" | "refresh_content" => Ok(DedupPolicy::RefreshContent),
            other => anyhow::bail!("unknown dedup policy: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Added,
    Duplicate,
    Refreshed,
}

/// Insert `item` unless an equal `(title, link)` row exists.
///
/// Check-then-insert is not atomic; the repository's own uniqueness check turns a
/// lost race into [`StoreOutcome::Duplicate`] instead of a second row.
pub fn store_if_new(
    repo: &dyn Repository,
    item: ListingItem,
    policy: DedupPolicy,
) -> Result<StoreOutcome, StoreError> {
    if let Some(existing) = repo.find_by_title_link(&item.title, &item.link)? {
        return match policy {
            DedupPolicy::SkipExisting => Ok(StoreOutcome::Duplicate),
            DedupPolicy::RefreshContent => refresh(repo, existing, &item),
        };
    }
    match repo.insert_item(item) {
        Ok(()) => Ok(StoreOutcome::Added),
        Err(StoreError::Duplicate { .. }) => Ok(StoreOutcome::Duplicate),
        Err(e) => Err(e),
    }
}

fn refresh(
    repo: &dyn Repository,
    mut existing: ListingItem,
    fresh: &ListingItem,
) -> Result<StoreOutcome, StoreError> {
    let before = existing.clone();
    existing.description = fresh.description.clone();
    existing.deadline = fresh.deadline;
    existing.prize = fresh.prize.clone();
    existing.company = fresh.company.clone();
    existing.location = fresh.location.clone();
    if existing == before {
        return Ok(StoreOutcome::Duplicate);
    }
    repo.update_item(&existing)?;
    Ok(StoreOutcome::Refreshed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::ListingType;
    use crate::store::MemoryRepository;
    use chrono::{NaiveDate, Utc};

    fn item(desc: &str) -> ListingItem {
        let mut it = ListingItem::pending(
            ListingType::Contest,
            "A".into(),
            "http://x/1".into(),
            NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            "s".into(),
            Utc::now(),
        );
        it.description = Some(desc.into());
        it
    }

    #[test]
    fn second_insert_is_a_duplicate() {
        let repo = MemoryRepository::new();
        assert_eq!(
            store_if_new(&repo, item("d"), DedupPolicy::SkipExisting).unwrap(),
            StoreOutcome::Added
        );
        assert_eq!(
            store_if_new(&repo, item("d"), DedupPolicy::SkipExisting).unwrap(),
            StoreOutcome::Duplicate
        );
        assert_eq!(repo.list_items().unwrap().len(), 1);
    }

    #[test]
    fn skip_policy_keeps_stale_fields() {
        let repo = MemoryRepository::new();
        store_if_new(&repo, item("old"), DedupPolicy::SkipExisting).unwrap();
        store_if_new(&repo, item("new"), DedupPolicy::SkipExisting).unwrap();
        let rows = repo.list_items().unwrap();
        assert_eq!(rows[0].description.as_deref(), Some("old"));
    }

    #[test]
    fn refresh_policy_updates_content_but_not_moderation() {
        let repo = MemoryRepository::new();
        let mut approved = item("old");
        approved.is_approved = true;
        approved.is_active = true;
        approved.approved_by = Some("mod-1".into());
        repo.insert_item(approved).unwrap();

        let out = store_if_new(&repo, item("new"), DedupPolicy::RefreshContent).unwrap();
        assert_eq!(out, StoreOutcome::Refreshed);
        let row = &repo.list_items().unwrap()[0];
        assert_eq!(row.description.as_deref(), Some("new"));
        assert!(row.is_approved && row.is_active);
        assert_eq!(row.approved_by.as_deref(), Some("mod-1"));

        let again = store_if_new(&repo, item("new"), DedupPolicy::RefreshContent).unwrap();
        assert_eq!(again, StoreOutcome::Duplicate);
    }
}
