use std::sync::RwLock;

use super::{Repository, Tables};
use crate::error::StoreError;
use crate::listing::{ListingItem, RunLog};

/// Process-local repository. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    inner: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Unavailable("memory repository lock poisoned".into()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Unavailable("memory repository lock poisoned".into()))
    }
}

impl Repository for MemoryRepository {
    fn ping(&self) -> Result<(), StoreError> {
        self.read().map(|_| ())
    }

    fn insert_item(&self, item: ListingItem) -> Result<(), StoreError> {
        self.write()?.insert_item(item)
    }

    fn get_item(&self, id: &str) -> Result<Option<ListingItem>, StoreError> {
        Ok(self.read()?.get_item(id))
    }

    fn find_by_title_link(
        &self,
        title: &str,
        link: &str,
    ) -> Result<Option<ListingItem>, StoreError> {
        Ok(self.read()?.find_by_title_link(title, link))
    }

    fn update_item(&self, item: &ListingItem) -> Result<bool, StoreError> {
        Ok(self.write()?.update_item(item))
    }

    fn delete_item(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.write()?.delete_item(id))
    }

    fn list_items(&self) -> Result<Vec<ListingItem>, StoreError> {
        Ok(self.read()?.items.clone())
    }

    fn insert_run_log(&self, log: RunLog) -> Result<(), StoreError> {
        self.write()?.run_logs.push(log);
        Ok(())
    }

    fn list_run_logs(&self, limit: usize) -> Result<Vec<RunLog>, StoreError> {
        Ok(self.read()?.recent_run_logs(limit))
    }
}
