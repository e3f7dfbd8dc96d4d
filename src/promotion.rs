// src/promotion.rs
//! Banner slots for published listings: promote, demote, reorder and the ordered
//! display read path.
//!
//! Priorities are scoped by location: a new banner appends after the highest priority
//! among banners whose location overlaps its own, and reordering swaps with the
//! neighbour in that same peer set.

use std::cmp::Ordering;

use serde::Deserialize;

use crate::error::WorkflowError;
use crate::lifecycle::Lifecycle;
use crate::listing::{BannerLocation, ListingItem};
use crate::moderation::{load, record_action, save, ModeratorId};
use crate::store::Repository;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

fn display_order(a: &ListingItem, b: &ListingItem) -> Ordering {
    a.banner_priority
        .cmp(&b.banner_priority)
        .then_with(|| a.crawled_at.cmp(&b.crawled_at))
        .then_with(|| a.id.cmp(&b.id))
}

fn all_banners(repo: &dyn Repository) -> Result<Vec<ListingItem>, WorkflowError> {
    Ok(repo
        .list_items()?
        .into_iter()
        .filter(|it| it.show_as_banner && it.is_published())
        .collect())
}

/// Place a published item on `location`. A first promotion appends to the end of the
/// banner order shown with `location`; promoting an existing banner only moves it.
pub fn promote(
    repo: &dyn Repository,
    id: &str,
    location: BannerLocation,
    by: &ModeratorId,
) -> Result<ListingItem, WorkflowError> {
    let (mut item, state) = load(repo, id)?;
    let next = state.promote()?;

    if state != Lifecycle::Promoted {
        let top = all_banners(repo)?
            .iter()
            .filter(|b| b.id != item.id)
            .filter(|b| b.banner_location.is_some_and(|l| l.overlaps(location)))
            .map(|b| b.banner_priority)
            .max()
            .unwrap_or(0);
        item.banner_priority = top + 1;
    }
    next.apply_flags(&mut item);
    item.banner_location = Some(location);
    save(repo, &item)?;

    record_action("promote");
    tracing::info!(
        target: "promotion",
        %id,
        moderator = by.as_str(),
        location = ?location,
        priority = item.banner_priority,
        "promoted"
    );
    Ok(item)
}

/// Take an item off the banner slots; it stays published.
pub fn demote(
    repo: &dyn Repository,
    id: &str,
    by: &ModeratorId,
) -> Result<ListingItem, WorkflowError> {
    let (mut item, state) = load(repo, id)?;
    let next = state.demote()?;
    if state == Lifecycle::ApprovedActive {
        return Ok(item);
    }
    next.apply_flags(&mut item);
    save(repo, &item)?;

    record_action("demote");
    tracing::info!(target: "promotion", %id, moderator = by.as_str(), "demoted");
    Ok(item)
}

/// Swap priority with the adjacent banner. At either end this is a no-op.
pub fn reorder(
    repo: &dyn Repository,
    id: &str,
    direction: Direction,
    by: &ModeratorId,
) -> Result<ListingItem, WorkflowError> {
    let (mut item, state) = load(repo, id)?;
    state.reorder()?;
    let loc = item
        .banner_location
        .ok_or_else(|| WorkflowError::Inconsistent(id.to_string()))?;

    let mut peers: Vec<ListingItem> = all_banners(repo)?
        .into_iter()
        .filter(|b| b.banner_location.is_some_and(|l| l.overlaps(loc)))
        .collect();
    peers.sort_by(display_order);

    let Some(pos) = peers.iter().position(|b| b.id == item.id) else {
        return Err(WorkflowError::NotFound(id.to_string()));
    };
    let neighbour = match direction {
        Direction::Up => pos.checked_sub(1),
        Direction::Down => Some(pos + 1).filter(|&n| n < peers.len()),
    };
    let Some(n) = neighbour else {
        tracing::debug!(target: "promotion", %id, ?direction, "already at boundary");
        return Ok(item);
    };

    let mut other = peers.swap_remove(n);
    if other.banner_priority == item.banner_priority {
        // tie broken by crawl time; nudge the mover past its neighbour
        item.banner_priority = match direction {
            Direction::Up => other.banner_priority - 1,
            Direction::Down => other.banner_priority + 1,
        };
    } else {
        std::mem::swap(&mut item.banner_priority, &mut other.banner_priority);
        save(repo, &other)?;
    }
    save(repo, &item)?;

    record_action("reorder");
    tracing::info!(
        target: "promotion",
        %id,
        moderator = by.as_str(),
        ?direction,
        swapped_with = %other.id,
        priority = item.banner_priority,
        "reordered"
    );
    Ok(item)
}

/// Banners in display order, optionally only those shown on `page`.
pub fn banners(
    repo: &dyn Repository,
    page: Option<BannerLocation>,
) -> Result<Vec<ListingItem>, WorkflowError> {
    let mut out: Vec<ListingItem> = all_banners(repo)?
        .into_iter()
        .filter(|b| match (page, b.banner_location) {
            (None, _) => true,
            (Some(p), Some(l)) => l.shows_on(p),
            (Some(_), None) => false,
        })
        .collect();
    out.sort_by(display_order);
    Ok(out)
}
