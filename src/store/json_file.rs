// src/store/json_file.rs
//! File-backed repository: the whole state is one JSON document, rewritten through a
//! temp file + rename after every mutation so a crash never leaves a torn file.
//!
//! Several processes may share one path (the server and the `crawl_once` job). Every
//! operation takes an advisory lock on a sidecar `.lock` file and re-reads the document
//! under it, so writes from other processes are never overwritten by a stale copy.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use super::{Repository, Tables};
use crate::error::StoreError;
use crate::listing::{ListingItem, RunLog};

#[derive(Debug)]
pub struct JsonFileRepository {
    path: PathBuf,
    lock_path: PathBuf,
}

impl JsonFileRepository {
    /// Open (or lazily create) the store at `path`. A missing file is an empty store;
    /// an unreadable or corrupt one is an error, never silently reset.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let lock_path = path.with_extension("json.lock");
        let repo = Self { path, lock_path };
        let (items, run_logs) = repo.read(|t| (t.items.len(), t.run_logs.len()))?;
        tracing::debug!(
            target: "store",
            path = %repo.path.display(),
            items,
            run_logs,
            "json store opened"
        );
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_dir(&self) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Lock held until the returned handle is dropped.
    fn lock_file(&self, exclusive: bool) -> Result<File, StoreError> {
        self.ensure_dir()?;
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)?;
        if exclusive {
            FileExt::lock_exclusive(&file)?;
        } else {
            FileExt::lock_shared(&file)?;
        }
        Ok(file)
    }

    fn load(&self) -> Result<Tables, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(s) if s.trim().is_empty() => Ok(Tables::default()),
            Ok(s) => Ok(serde_json::from_str(&s)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Tables::default()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn persist(&self, tables: &Tables) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(tables)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> Result<T, StoreError> {
        let _lock = self.lock_file(false)?;
        Ok(f(&self.load()?))
    }

    /// Re-read the document, apply `f`, and write it back if `f` reports a change.
    /// The exclusive lock spans the read and the rename.
    fn transact(
        &self,
        f: impl FnOnce(&mut Tables) -> Result<bool, StoreError>,
    ) -> Result<bool, StoreError> {
        let _lock = self.lock_file(true)?;
        let mut tables = self.load()?;
        let changed = f(&mut tables)?;
        if changed {
            self.persist(&tables)?;
        }
        Ok(changed)
    }
}

impl Repository for JsonFileRepository {
    fn ping(&self) -> Result<(), StoreError> {
        match self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            Some(dir) if dir.exists() && !dir.is_dir() => Err(StoreError::Unavailable(format!(
                "{} is not a directory",
                dir.display()
            ))),
            _ => self.lock_file(false).map(drop),
        }
    }

    fn insert_item(&self, item: ListingItem) -> Result<(), StoreError> {
        self.transact(|t| t.insert_item(item).map(|()| true)).map(drop)
    }

    fn get_item(&self, id: &str) -> Result<Option<ListingItem>, StoreError> {
        self.read(|t| t.get_item(id))
    }

    fn find_by_title_link(
        &self,
        title: &str,
        link: &str,
    ) -> Result<Option<ListingItem>, StoreError> {
        self.read(|t| t.find_by_title_link(title, link))
    }

    fn update_item(&self, item: &ListingItem) -> Result<bool, StoreError> {
        self.transact(|t| Ok(t.update_item(item)))
    }

    fn delete_item(&self, id: &str) -> Result<bool, StoreError> {
        self.transact(|t| Ok(t.delete_item(id)))
    }

    fn list_items(&self) -> Result<Vec<ListingItem>, StoreError> {
        self.read(|t| t.items.clone())
    }

    fn insert_run_log(&self, log: RunLog) -> Result<(), StoreError> {
        self.transact(|t| {
            t.run_logs.push(log);
            Ok(true)
        })
        .map(drop)
    }

    fn list_run_logs(&self, limit: usize) -> Result<Vec<RunLog>, StoreError> {
        self.read(|t| t.recent_run_logs(limit))
    }
}
