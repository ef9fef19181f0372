//! Startup choice between the private and the shared store.
//!
//! [`decide`] is a pure function over a [`Probe`] of the environment;
//! [`select`] gathers the probe, opens the chosen store, runs the one-time
//! migration when binding shared and falls back to the private store if
//! anything on that path fails. [`select_once`] caches the result for the
//! life of the process.

use crate::config::Config;
use crate::error::Result;
use crate::migration::{self, MigrationReport};
use crate::store::{BackendKind, PrivateStore, SharedStore, Store};
use crate::{instances, paths};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

/// Setting this to `shared` requests the shared store.
pub const STORAGE_ENV: &str = "PDL_STORAGE_BACKEND";

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Observed environment at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Probe {
    /// Bytes of project data in the shared store, if its file exists.
    pub shared_store_bytes: Option<u64>,
    pub migration_marker: bool,
    /// Live `pdl` server processes other than this one.
    pub other_instances: usize,
    pub shared_override: bool,
    /// The private store holds at least one project.
    pub private_store_exists: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectReason {
    SharedStorePopulated,
    MigrationCompleted,
    ConcurrentInstances,
    EnvironmentOverride,
    ExistingPrivateStore,
    FreshEnvironment,
}

impl SelectReason {
    pub fn describe(self) -> &'static str {
        match self {
            SelectReason::SharedStorePopulated => "shared store already holds data",
            SelectReason::MigrationCompleted => "private store was migrated to shared",
            SelectReason::ConcurrentInstances => "another instance is running",
            SelectReason::EnvironmentOverride => "PDL_STORAGE_BACKEND=shared",
            SelectReason::ExistingPrivateStore => "existing private store",
            SelectReason::FreshEnvironment => "fresh environment",
        }
    }
}

/// First matching rule wins.
pub fn decide(probe: &Probe, min_shared_bytes: u64) -> (BackendKind, SelectReason) {
    use BackendKind::{Private, Shared};
    if probe
        .shared_store_bytes
        .is_some_and(|n| n > min_shared_bytes)
    {
        return (Shared, SelectReason::SharedStorePopulated);
    }
    if probe.migration_marker {
        return (Shared, SelectReason::MigrationCompleted);
    }
    if probe.other_instances > 0 {
        return (Shared, SelectReason::ConcurrentInstances);
    }
    if probe.shared_override {
        return (Shared, SelectReason::EnvironmentOverride);
    }
    if probe.private_store_exists {
        return (Private, SelectReason::ExistingPrivateStore);
    }
    (Shared, SelectReason::FreshEnvironment)
}

/// Whether an environment value requests the shared store.
pub fn is_shared_override(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("shared"))
}

// ---------------------------------------------------------------------------
// Probing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SelectorContext {
    pub root: PathBuf,
    pub shared_path: PathBuf,
    pub instances_dir: PathBuf,
    pub min_shared_bytes: u64,
    pub env_override: bool,
}

impl SelectorContext {
    pub fn from_config(root: &Path, config: &Config) -> Result<Self> {
        let shared_path = config.shared_store_path(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            instances_dir: paths::instances_dir_for(&shared_path),
            shared_path,
            min_shared_bytes: config.storage.min_shared_bytes,
            env_override: is_shared_override(std::env::var(STORAGE_ENV).ok().as_deref()),
        })
    }

    pub fn probe(&self) -> Probe {
        let other_instances =
            instances::count_live_others(&self.instances_dir, std::process::id())
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "could not read instance registry");
                    0
                });
        Probe {
            shared_store_bytes: SharedStore::stored_bytes(&self.shared_path).unwrap_or_else(
                |e| {
                    tracing::warn!(error = %e, "could not measure shared store");
                    None
                },
            ),
            migration_marker: paths::migration_marker_path(&self.root).exists(),
            other_instances,
            shared_override: self.env_override,
            private_store_exists: PrivateStore::new(&self.root).has_projects(),
        }
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// What was chosen and why; reported by `pdl storage status` and the server.
#[derive(Debug, Clone, Serialize)]
pub struct SelectionInfo {
    /// Backend actually bound.
    pub backend: BackendKind,
    /// Backend the decision procedure asked for.
    pub decided: BackendKind,
    pub reason: SelectReason,
    pub reason_text: &'static str,
    pub private_path: PathBuf,
    pub shared_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migration: Option<MigrationReport>,
    /// Why the shared binding was abandoned, when it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    pub selected_at: DateTime<Utc>,
}

impl SelectionInfo {
    pub fn new(
        backend: BackendKind,
        reason: SelectReason,
        private_path: PathBuf,
        shared_path: PathBuf,
    ) -> Self {
        Self {
            backend,
            decided: backend,
            reason,
            reason_text: reason.describe(),
            private_path,
            shared_path,
            migration: None,
            fallback: None,
            selected_at: Utc::now(),
        }
    }
}

#[derive(Clone)]
pub struct Selection {
    pub store: Arc<dyn Store>,
    pub info: SelectionInfo,
}

/// Decide, open and (for shared) migrate. Never fails: any error on the
/// shared path binds the private store and records the cause.
pub fn select(ctx: &SelectorContext) -> Selection {
    let probe = ctx.probe();
    let (decided, reason) = decide(&probe, ctx.min_shared_bytes);
    tracing::info!(
        backend = %decided,
        reason = reason.describe(),
        "storage backend decided"
    );

    let mut info = SelectionInfo::new(
        decided,
        reason,
        paths::projects_dir(&ctx.root),
        ctx.shared_path.clone(),
    );

    if decided == BackendKind::Private {
        return Selection {
            store: Arc::new(PrivateStore::new(&ctx.root)),
            info,
        };
    }

    match bind_shared(ctx) {
        Ok((store, migration)) => {
            info.migration = migration;
            Selection { store, info }
        }
        Err(e) => {
            tracing::warn!(error = %e, "shared store unavailable; falling back to private store");
            info.backend = BackendKind::Private;
            info.fallback = Some(e.to_string());
            Selection {
                store: Arc::new(PrivateStore::new(&ctx.root)),
                info,
            }
        }
    }
}

fn bind_shared(ctx: &SelectorContext) -> Result<(Arc<dyn Store>, Option<MigrationReport>)> {
    let shared = SharedStore::open(&ctx.shared_path)?;
    let migration = migration::migrate_if_needed(&ctx.root, &shared)?;
    Ok((Arc::new(shared), migration))
}

static SELECTION: OnceLock<Selection> = OnceLock::new();

/// Process-wide selection; the first caller's context wins.
pub fn select_once(ctx: &SelectorContext) -> &'static Selection {
    SELECTION.get_or_init(|| select(ctx))
}

/// The cached selection, if [`select_once`] has run.
pub fn active() -> Option<&'static Selection> {
    SELECTION.get()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::Project;
    use tempfile::TempDir;

    const MIN: u64 = 16384;

    #[test]
    fn populated_shared_store_wins() {
        let probe = Probe {
            shared_store_bytes: Some(MIN + 1),
            private_store_exists: true,
            ..Default::default()
        };
        assert_eq!(
            decide(&probe, MIN),
            (BackendKind::Shared, SelectReason::SharedStorePopulated)
        );
    }

    #[test]
    fn small_shared_store_falls_through() {
        let probe = Probe {
            shared_store_bytes: Some(MIN - 1),
            private_store_exists: true,
            ..Default::default()
        };
        assert_eq!(
            decide(&probe, MIN),
            (BackendKind::Private, SelectReason::ExistingPrivateStore)
        );
    }

    #[test]
    fn threshold_must_be_exceeded() {
        let probe = Probe {
            shared_store_bytes: Some(MIN),
            private_store_exists: true,
            ..Default::default()
        };
        assert_eq!(decide(&probe, MIN).1, SelectReason::ExistingPrivateStore);
        let empty = Probe {
            shared_store_bytes: Some(0),
            ..Default::default()
        };
        assert_eq!(decide(&empty, 0).1, SelectReason::FreshEnvironment);
    }

    #[test]
    fn marker_binds_shared() {
        let probe = Probe {
            migration_marker: true,
            private_store_exists: true,
            ..Default::default()
        };
        assert_eq!(decide(&probe, MIN).1, SelectReason::MigrationCompleted);
    }

    #[test]
    fn concurrent_instances_bind_shared() {
        let probe = Probe {
            other_instances: 1,
            private_store_exists: true,
            ..Default::default()
        };
        assert_eq!(
            decide(&probe, MIN),
            (BackendKind::Shared, SelectReason::ConcurrentInstances)
        );
    }

    #[test]
    fn override_beats_private_store() {
        let probe = Probe {
            shared_override: true,
            private_store_exists: true,
            ..Default::default()
        };
        assert_eq!(decide(&probe, MIN).1, SelectReason::EnvironmentOverride);
    }

    #[test]
    fn fresh_environment_is_shared() {
        assert_eq!(
            decide(&Probe::default(), MIN),
            (BackendKind::Shared, SelectReason::FreshEnvironment)
        );
    }

    #[test]
    fn override_parsing() {
        assert!(is_shared_override(Some("shared")));
        assert!(is_shared_override(Some(" SHARED ")));
        assert!(!is_shared_override(Some("private")));
        assert!(!is_shared_override(None));
    }

    fn context(dir: &TempDir) -> SelectorContext {
        let shared_path = dir.path().join("home/.pdl/shared.redb");
        SelectorContext {
            root: dir.path().join("proj"),
            instances_dir: paths::instances_dir_for(&shared_path),
            shared_path,
            min_shared_bytes: MIN,
            env_override: false,
        }
    }

    #[test]
    fn select_keeps_existing_private_store() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);
        PrivateStore::new(&ctx.root)
            .replace("alpha", &Project::new("alpha"))
            .unwrap();

        let selection = select(&ctx);
        assert_eq!(selection.info.backend, BackendKind::Private);
        assert_eq!(selection.store.list_all().unwrap(), ["alpha"]);
        assert!(!ctx.shared_path.exists());
    }

    #[test]
    fn empty_shared_store_keeps_existing_private_store() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        ctx.min_shared_bytes = 0;
        // Left behind by an earlier fresh-environment run elsewhere.
        SharedStore::open(&ctx.shared_path).unwrap();
        PrivateStore::new(&ctx.root)
            .replace("alpha", &Project::new("alpha"))
            .unwrap();

        assert_eq!(ctx.probe().shared_store_bytes, Some(0));
        let selection = select(&ctx);
        assert_eq!(selection.info.backend, BackendKind::Private);
        assert_eq!(selection.info.reason, SelectReason::ExistingPrivateStore);
        assert!(!paths::migration_marker_path(&ctx.root).exists());
    }

    #[test]
    fn shared_store_holding_projects_is_populated() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        ctx.min_shared_bytes = 0;
        SharedStore::open(&ctx.shared_path)
            .unwrap()
            .replace("beta", &Project::new("beta"))
            .unwrap();
        PrivateStore::new(&ctx.root)
            .replace("alpha", &Project::new("alpha"))
            .unwrap();

        let selection = select(&ctx);
        assert_eq!(selection.info.backend, BackendKind::Shared);
        assert_eq!(selection.info.reason, SelectReason::SharedStorePopulated);
        assert_eq!(selection.store.list_all().unwrap(), ["alpha", "beta"]);
    }

    #[test]
    fn override_migrates_private_projects() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        ctx.env_override = true;
        PrivateStore::new(&ctx.root)
            .replace("alpha", &Project::new("alpha"))
            .unwrap();

        let selection = select(&ctx);
        assert_eq!(selection.info.backend, BackendKind::Shared);
        assert_eq!(selection.store.kind(), BackendKind::Shared);
        let report = selection.info.migration.as_ref().unwrap();
        assert_eq!(report.copied, ["alpha"]);
        assert_eq!(selection.store.list_all().unwrap(), ["alpha"]);

        // Next start sees the marker.
        ctx.env_override = false;
        let again = select(&ctx);
        assert_eq!(again.info.reason, SelectReason::MigrationCompleted);
        assert!(again.info.migration.is_none());
    }

    #[test]
    fn unusable_shared_path_falls_back_to_private() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(&dir);
        // A regular file where the shared store's directory should be.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        ctx.shared_path = blocker.join("shared.redb");
        ctx.instances_dir = paths::instances_dir_for(&ctx.shared_path);

        let selection = select(&ctx);
        assert_eq!(selection.info.decided, BackendKind::Shared);
        assert_eq!(selection.info.backend, BackendKind::Private);
        assert!(selection.info.fallback.is_some());
        assert_eq!(selection.store.kind(), BackendKind::Private);
    }
}
