// src/moderation.rs
//! Moderation surface: approve / reject / delete plus the two read paths
//! (pending queue, published listings).

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;

use crate::error::WorkflowError;
use crate::lifecycle::Lifecycle;
use crate::listing::{ListingItem, ListingType};
use crate::store::Repository;

/// Non-empty acting-user identity, supplied by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeratorId(String);

impl ModeratorId {
    pub fn new(raw: &str) -> Result<Self, WorkflowError> {
        let t = raw.trim();
        if t.is_empty() {
            return Err(WorkflowError::MissingModerator);
        }
        Ok(Self(t.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub(crate) fn record_action(action: &'static str) {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "moderation_actions_total",
            "Moderation and promotion actions applied, by action."
        );
    });
    counter!("moderation_actions_total", "action" => action).increment(1);
}

/// Load a row and its validated state.
pub(crate) fn load(
    repo: &dyn Repository,
    id: &str,
) -> Result<(ListingItem, Lifecycle), WorkflowError> {
    let item = repo
        .get_item(id)?
        .ok_or_else(|| WorkflowError::NotFound(id.to_string()))?;
    let state = Lifecycle::from_flags(&item)?;
    Ok((item, state))
}

/// Persist an updated row; a row that vanished in between is reported as not found.
pub(crate) fn save(repo: &dyn Repository, item: &ListingItem) -> Result<(), WorkflowError> {
    if repo.update_item(item)? {
        Ok(())
    } else {
        Err(WorkflowError::NotFound(item.id.clone()))
    }
}

/// Publish a pending item, or refresh the audit fields of an already published one.
pub fn approve(
    repo: &dyn Repository,
    id: &str,
    by: &ModeratorId,
    now: DateTime<Utc>,
) -> Result<ListingItem, WorkflowError> {
    let (mut item, state) = load(repo, id)?;
    let next = state.approve()?;
    next.apply_flags(&mut item);
    item.approved_at = Some(now);
    item.approved_by = Some(by.as_str().to_string());
    save(repo, &item)?;

    record_action("approve");
    tracing::info!(target: "moderation", %id, moderator = by.as_str(), from = ?state, "approved");
    Ok(item)
}

/// Hard-delete a pending item. Irreversible; a later crawl may re-add it as pending.
pub fn reject(repo: &dyn Repository, id: &str, by: &ModeratorId) -> Result<(), WorkflowError> {
    let (_, state) = load(repo, id)?;
    state.reject()?;
    if !repo.delete_item(id)? {
        return Err(WorkflowError::NotFound(id.to_string()));
    }

    record_action("reject");
    tracing::info!(target: "moderation", %id, moderator = by.as_str(), "rejected");
    Ok(())
}

/// Administrative removal in any state, including rows with inconsistent flags.
pub fn delete(repo: &dyn Repository, id: &str, by: &ModeratorId) -> Result<(), WorkflowError> {
    if !repo.delete_item(id)? {
        return Err(WorkflowError::NotFound(id.to_string()));
    }
    record_action("delete");
    tracing::info!(target: "moderation", %id, moderator = by.as_str(), "deleted");
    Ok(())
}

/// Items awaiting a decision, oldest crawl first.
pub fn pending_queue(repo: &dyn Repository) -> Result<Vec<ListingItem>, WorkflowError> {
    let mut out: Vec<ListingItem> = repo
        .list_items()?
        .into_iter()
        .filter(|it| matches!(Lifecycle::from_flags(it), Ok(Lifecycle::Pending)))
        .collect();
    out.sort_by(|a, b| a.crawled_at.cmp(&b.crawled_at));
    Ok(out)
}

/// Approved and active items, optionally of one type, soonest deadline first.
pub fn published(
    repo: &dyn Repository,
    item_type: Option<ListingType>,
) -> Result<Vec<ListingItem>, WorkflowError> {
    let mut out: Vec<ListingItem> = repo
        .list_items()?
        .into_iter()
        .filter(|it| it.is_published())
        .filter(|it| item_type.map_or(true, |t| it.item_type == t))
        .collect();
    out.sort_by(|a, b| {
        a.deadline
            .cmp(&b.deadline)
            .then_with(|| a.crawled_at.cmp(&b.crawled_at))
    });
    Ok(out)
}
