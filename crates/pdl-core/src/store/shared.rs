//! Shared project store backed by redb.
//!
//! # Table design
//!
//! A single `PROJECTS` table maps the project name to the JSON-encoded
//! aggregate. The database file is opened per operation and closed again so
//! that several processes can use the same file; redb holds an exclusive
//! lock while open, so a concurrent open is retried briefly.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use redb::{Database, DatabaseError, ReadableTable, TableDefinition, TableError};

use super::{check_key, BackendKind, Store};
use crate::error::{PdlError, Result};
use crate::paths;
use crate::project::Project;

// ---------------------------------------------------------------------------
// Table definition
// ---------------------------------------------------------------------------

/// Key: project name. Value: JSON-encoded `Project`.
const PROJECTS: TableDefinition<&str, &[u8]> = TableDefinition::new("projects");

const OPEN_RETRIES: u32 = 20;
const OPEN_BACKOFF: Duration = Duration::from_millis(25);

fn storage_err(e: impl std::fmt::Display) -> PdlError {
    PdlError::Storage(e.to_string())
}

// ---------------------------------------------------------------------------
// SharedStore
// ---------------------------------------------------------------------------

pub struct SharedStore {
    path: PathBuf,
    /// Serializes in-process access; redb refuses a second open of the same file.
    lock: Mutex<()>,
}

impl SharedStore {
    /// Open or create the shared database at `path` and ensure the table exists.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            crate::io::ensure_dir(parent)?;
        }
        let store = Self {
            path: path.to_path_buf(),
            lock: Mutex::new(()),
        };
        store.with_db(|db| {
            let wt = db.begin_write().map_err(storage_err)?;
            wt.open_table(PROJECTS).map_err(storage_err)?;
            wt.commit().map_err(storage_err)?;
            Ok(())
        })?;
        Ok(store)
    }

    fn with_db<T>(&self, f: impl FnOnce(&Database) -> Result<T>) -> Result<T> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let db = self.open_db()?;
        f(&db)
    }

    fn open_db(&self) -> Result<Database> {
        open_with_retry(&self.path, |p| Database::create(p))
    }

    /// Bytes of project data held by the database at `path`: keys plus
    /// encoded aggregates. `None` when no database file exists. The file is
    /// never created, and its on-disk size (which includes preallocated
    /// pages) is not used.
    pub fn stored_bytes(path: &Path) -> Result<Option<u64>> {
        if !path.is_file() {
            return Ok(None);
        }
        let db = open_with_retry(path, |p| Database::open(p))?;
        let rt = db.begin_read().map_err(storage_err)?;
        let table = match rt.open_table(PROJECTS) {
            Ok(t) => t,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Some(0)),
            Err(e) => return Err(storage_err(e)),
        };
        let mut total: u64 = 0;
        for entry in table.iter().map_err(storage_err)? {
            let (k, v) = entry.map_err(storage_err)?;
            total = total.saturating_add((k.value().len() + v.value().len()) as u64);
        }
        Ok(Some(total))
    }
}

fn open_with_retry(
    path: &Path,
    open: impl Fn(&Path) -> std::result::Result<Database, DatabaseError>,
) -> Result<Database> {
    let mut attempt = 0;
    loop {
        match open(path) {
            Ok(db) => return Ok(db),
            Err(DatabaseError::DatabaseAlreadyOpen) if attempt < OPEN_RETRIES => {
                attempt += 1;
                std::thread::sleep(OPEN_BACKOFF);
            }
            Err(e) => return Err(PdlError::Storage(format!("open {}: {e}", path.display()))),
        }
    }
}

impl Store for SharedStore {
    fn fetch(&self, name: &str) -> Result<Option<Project>> {
        paths::validate_name(name)?;
        self.with_db(|db| {
            let rt = db.begin_read().map_err(storage_err)?;
            let table = match rt.open_table(PROJECTS) {
                Ok(t) => t,
                Err(TableError::TableDoesNotExist(_)) => return Ok(None),
                Err(e) => return Err(storage_err(e)),
            };
            let Some(value) = table.get(name).map_err(storage_err)? else {
                return Ok(None);
            };
            let project = serde_json::from_slice(value.value())
                .map_err(|e| PdlError::Storage(format!("decode '{name}': {e}")))?;
            Ok(Some(project))
        })
    }

    fn replace(&self, name: &str, project: &Project) -> Result<()> {
        paths::validate_name(name)?;
        check_key(name, project)?;
        let value = serde_json::to_vec(project)?;
        self.with_db(|db| {
            let wt = db.begin_write().map_err(storage_err)?;
            {
                let mut table = wt.open_table(PROJECTS).map_err(storage_err)?;
                table
                    .insert(name, value.as_slice())
                    .map_err(storage_err)?;
            }
            wt.commit().map_err(storage_err)?;
            Ok(())
        })
    }

    fn list_all(&self) -> Result<Vec<String>> {
        self.with_db(|db| {
            let rt = db.begin_read().map_err(storage_err)?;
            let table = match rt.open_table(PROJECTS) {
                Ok(t) => t,
                Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
                Err(e) => return Err(storage_err(e)),
            };
            let mut names = Vec::new();
            for entry in table.iter().map_err(storage_err)? {
                let (k, _) = entry.map_err(storage_err)?;
                names.push(k.value().to_string());
            }
            // Key order is already lexicographic.
            Ok(names)
        })
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Shared
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::contract;
    use tempfile::TempDir;

    fn open_tmp() -> (TempDir, SharedStore) {
        let dir = TempDir::new().unwrap();
        let store = SharedStore::open(&dir.path().join("nested/shared.redb")).unwrap();
        (dir, store)
    }

    #[test]
    fn satisfies_store_contract() {
        let (_dir, store) = open_tmp();
        contract::fetch_missing_is_none(&store);
        contract::replace_then_fetch(&store);
        contract::rejects_mismatched_key(&store);
    }

    #[test]
    fn lists_sorted() {
        let (_dir, store) = open_tmp();
        contract::list_all_sorted(&store);
    }

    #[test]
    fn two_handles_share_one_file() {
        let (dir, first) = open_tmp();
        let second = SharedStore::open(&dir.path().join("nested/shared.redb")).unwrap();

        first.replace("alpha", &Project::new("alpha")).unwrap();
        assert!(second.fetch("alpha").unwrap().is_some());

        let mut p = second.fetch("alpha").unwrap().unwrap();
        p.description = Some("from second".into());
        second.replace("alpha", &p).unwrap();
        let seen = first.fetch("alpha").unwrap().unwrap();
        assert_eq!(seen.description.as_deref(), Some("from second"));
    }

    #[test]
    fn data_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shared.redb");
        {
            let store = SharedStore::open(&path).unwrap();
            store.replace("beta", &Project::new("beta")).unwrap();
        }
        let store = SharedStore::open(&path).unwrap();
        assert_eq!(store.list_all().unwrap(), ["beta"]);
    }

    #[test]
    fn stored_bytes_counts_data_not_file_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shared.redb");
        assert_eq!(SharedStore::stored_bytes(&path).unwrap(), None);
        assert!(!path.exists());

        let store = SharedStore::open(&path).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
        assert_eq!(SharedStore::stored_bytes(&path).unwrap(), Some(0));

        let project = Project::new("alpha");
        store.replace("alpha", &project).unwrap();
        let encoded = serde_json::to_vec(&project).unwrap();
        assert_eq!(
            SharedStore::stored_bytes(&path).unwrap(),
            Some(("alpha".len() + encoded.len()) as u64)
        );
    }
}
