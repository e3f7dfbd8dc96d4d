// src/store/mod.rs
//! Repository primitives for listing rows and run logs.
//!
//! Synchronous on purpose: every call is a single-row read or write with
//! success/failure + affected-row semantics. Implementations must reject a second
//! row with the same `(title, link)` themselves, so uniqueness does not depend on the
//! caller's check-then-insert.

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileRepository;
pub use memory::MemoryRepository;

use crate::error::StoreError;
use crate::listing::{ListingItem, RunLog};

pub trait Repository: Send + Sync {
    /// Reachability check run before a crawl starts.
    fn ping(&self) -> Result<(), StoreError>;

    /// Insert a new row. Fails with [`StoreError::Duplicate`] on a `(title, link)` clash.
    fn insert_item(&self, item: ListingItem) -> Result<(), StoreError>;

    fn get_item(&self, id: &str) -> Result<Option<ListingItem>, StoreError>;

    fn find_by_title_link(&self, title: &str, link: &str)
        -> Result<Option<ListingItem>, StoreError>;

    /// Replace the row with the same id. Returns false when no such row exists.
    fn update_item(&self, item: &ListingItem) -> Result<bool, StoreError>;

    /// Returns false when no such row exists.
    fn delete_item(&self, id: &str) -> Result<bool, StoreError>;

    /// All rows in insertion order.
    fn list_items(&self) -> Result<Vec<ListingItem>, StoreError>;

    fn insert_run_log(&self, log: RunLog) -> Result<(), StoreError>;

    /// Newest first, at most `limit` rows.
    fn list_run_logs(&self, limit: usize) -> Result<Vec<RunLog>, StoreError>;
}

/// In-memory table shared by both implementations.
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub(crate) struct Tables {
    #[serde(default)]
    pub items: Vec<ListingItem>,
    #[serde(default)]
    pub run_logs: Vec<RunLog>,
}

impl Tables {
    pub fn insert_item(&mut self, item: ListingItem) -> Result<(), StoreError> {
        if self
            .items
            .iter()
            .any(|it| it.id == item.id || (it.title == item.title && it.link == item.link))
        {
            return Err(StoreError::Duplicate {
                title: item.title,
                link: item.link,
            });
        }
        self.items.push(item);
        Ok(())
    }

    pub fn get_item(&self, id: &str) -> Option<ListingItem> {
        self.items.iter().find(|it| it.id == id).cloned()
    }

    pub fn find_by_title_link(&self, title: &str, link: &str) -> Option<ListingItem> {
        self.items
            .iter()
            .find(|it| it.title == title && it.link == link)
            .cloned()
    }

    pub fn update_item(&mut self, item: &ListingItem) -> bool {
        match self.items.iter_mut().find(|it| it.id == item.id) {
            Some(slot) => {
                *slot = item.clone();
                true
            }
            None => false,
        }
    }

    pub fn delete_item(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|it| it.id != id);
        self.items.len() != before
    }

    pub fn recent_run_logs(&self, limit: usize) -> Vec<RunLog> {
        self.run_logs.iter().rev().take(limit).cloned().collect()
    }
}
