//! The storage port: a key-addressed repository of whole project aggregates.
//!
//! The engine only ever talks to `dyn Store`. Two implementations exist:
//! [`PrivateStore`] (one YAML document per project under the project root)
//! and [`SharedStore`] (a redb database that several processes can share).
//! Which one is bound is decided once at startup by [`crate::selector`].

pub mod private;
pub mod shared;

pub use private::PrivateStore;
pub use shared::SharedStore;

use crate::error::Result;
use crate::project::Project;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Private,
    Shared,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::Private => "private",
            BackendKind::Shared => "shared",
        })
    }
}

pub trait Store: Send + Sync {
    /// Load the aggregate stored under `name`, or `None` if absent.
    fn fetch(&self, name: &str) -> Result<Option<Project>>;

    /// Replace (or create) the aggregate stored under `name`. Last write wins.
    fn replace(&self, name: &str, project: &Project) -> Result<()>;

    /// Names of every stored project, sorted.
    fn list_all(&self) -> Result<Vec<String>>;

    /// Diagnostics only.
    fn kind(&self) -> BackendKind;

    fn location(&self) -> &Path;
}

/// Reject a write whose document does not belong under `name`.
pub(crate) fn check_key(name: &str, project: &Project) -> Result<()> {
    if project.name != name {
        return Err(crate::PdlError::InvariantViolation(format!(
            "document for project '{}' cannot be stored under '{name}'",
            project.name
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod contract {
    //! Behaviour every backend must share.

    use super::*;

    pub fn fetch_missing_is_none(store: &dyn Store) {
        assert!(store.fetch("ghost").unwrap().is_none());
    }

    pub fn replace_then_fetch(store: &dyn Store) {
        let mut p = Project::new("alpha");
        p.description = Some("first".into());
        store.replace("alpha", &p).unwrap();
        p.description = Some("second".into());
        store.replace("alpha", &p).unwrap();

        let loaded = store.fetch("alpha").unwrap().unwrap();
        assert_eq!(loaded.description.as_deref(), Some("second"));
    }

    pub fn list_all_sorted(store: &dyn Store) {
        for name in ["gamma", "alpha", "beta"] {
            store.replace(name, &Project::new(name)).unwrap();
        }
        assert_eq!(store.list_all().unwrap(), ["alpha", "beta", "gamma"]);
    }

    pub fn rejects_mismatched_key(store: &dyn Store) {
        let p = Project::new("alpha");
        assert!(store.replace("beta", &p).is_err());
        assert!(store.fetch("beta").unwrap().is_none());
    }
}
