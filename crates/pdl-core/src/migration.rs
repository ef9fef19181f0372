//! One-shot copy of the private store into the shared store.
//!
//! Completion is recorded in `<root>/.pdl/migrated.yaml`; once the marker
//! exists the selector binds the shared store without probing further.

use crate::error::{PdlError, Result};
use crate::io::atomic_write;
use crate::paths;
use crate::store::{PrivateStore, Store};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub migrated_at: DateTime<Utc>,
    /// Projects written to the shared store.
    pub copied: Vec<String>,
    /// Projects left alone because the shared copy was at least as new.
    #[serde(default)]
    pub skipped: Vec<String>,
    pub count: usize,
    pub shared_path: PathBuf,
}

/// The marker written by a completed migration, if any.
pub fn read_marker(root: &Path) -> Result<Option<MigrationReport>> {
    let path = paths::migration_marker_path(root);
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(&path)?;
    Ok(Some(serde_yaml::from_str(&data)?))
}

/// Migrate when the private store holds projects and no marker exists.
pub fn migrate_if_needed(root: &Path, shared: &dyn Store) -> Result<Option<MigrationReport>> {
    let private = PrivateStore::new(root);
    if !private.has_projects() || paths::migration_marker_path(root).exists() {
        return Ok(None);
    }
    migrate(root, &private, shared).map(Some)
}

/// Copy every private aggregate into `shared` unless the shared copy is
/// newer, then write the marker. Any failure surfaces as `Migration`.
pub fn migrate(root: &Path, private: &dyn Store, shared: &dyn Store) -> Result<MigrationReport> {
    copy_all(private, shared)
        .and_then(|(copied, skipped)| {
            let report = MigrationReport {
                migrated_at: Utc::now(),
                count: copied.len(),
                copied,
                skipped,
                shared_path: shared.location().to_path_buf(),
            };
            let data = serde_yaml::to_string(&report)?;
            atomic_write(&paths::migration_marker_path(root), data.as_bytes())?;
            Ok(report)
        })
        .map_err(|e| match e {
            PdlError::Migration(_) => e,
            other => PdlError::Migration(other.to_string()),
        })
        .inspect(|report| {
            tracing::info!(
                copied = report.copied.len(),
                skipped = report.skipped.len(),
                "migrated private store into shared store"
            );
        })
}

fn copy_all(private: &dyn Store, shared: &dyn Store) -> Result<(Vec<String>, Vec<String>)> {
    let mut copied = Vec::new();
    let mut skipped = Vec::new();
    for name in private.list_all()? {
        let Some(project) = private.fetch(&name)? else {
            continue;
        };
        if let Some(existing) = shared.fetch(&name)? {
            if existing.updated_at >= project.updated_at {
                skipped.push(name);
                continue;
            }
        }
        shared.replace(&name, &project)?;
        copied.push(name);
    }
    Ok((copied, skipped))
}
