//! Lifecycle manipulation engine.
//!
//! Every operation follows the same path: load the project aggregate through
//! the [`Store`], mutate an in-memory copy, run the restore pass over the
//! affected collection, validate, append to the activity log and write the
//! aggregate back with a single `replace`. Nothing is persisted when any step
//! fails.

pub mod cycles;
pub mod invariants;
pub mod phases;
pub mod sprints;

pub use cycles::{CycleInserted, MilestoneAdded, StageUpdated, TaskInserted, TaskUpdated};
pub use phases::{PhaseDeleted, PhaseInserted, PhaseUpdated};
pub use sprints::{SprintDeleted, SprintInserted, SprintMove, SprintUpdated, SprintsMoved};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PdlError, Result};
use crate::paths;
use crate::project::Project;
use crate::store::Store;

pub const DEFAULT_PHASE_WEEKS: u32 = 2;

/// Implemented by every operation result so the commit path can log it.
pub trait Outcome {
    fn message(&self) -> &str;
}

/// Result of a whole-list reorder of phases or of one phase's sprints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reordered {
    pub success: bool,
    pub order: Vec<String>,
    /// Existing entities the caller's list left out; kept at the end.
    pub appended: Vec<String>,
    /// Identifiers in the caller's list that matched nothing (or repeated).
    pub ignored: Vec<String>,
    pub message: String,
}

impl Outcome for Reordered {
    fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectCreated {
    pub success: bool,
    pub project: Project,
    pub message: String,
}

pub struct Engine {
    store: Arc<dyn Store>,
    default_phase_weeks: u32,
}

impl Engine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            default_phase_weeks: DEFAULT_PHASE_WEEKS,
        }
    }

    pub fn with_default_phase_weeks(mut self, weeks: u32) -> Self {
        self.default_phase_weeks = weeks;
        self
    }

    // ---------------------------------------------------------------------------
    // Projects
    // ---------------------------------------------------------------------------

    pub fn project(&self, name: &str) -> Result<Project> {
        self.store
            .fetch(name)?
            .ok_or_else(|| PdlError::ProjectNotFound(name.to_string()))
    }

    pub fn list_projects(&self) -> Result<Vec<String>> {
        self.store.list_all()
    }

    pub fn create_project(
        &self,
        name: &str,
        description: Option<String>,
        vision: Option<String>,
    ) -> Result<ProjectCreated> {
        paths::validate_name(name)?;
        if self.store.fetch(name)?.is_some() {
            return Err(PdlError::ProjectExists(name.to_string()));
        }
        let mut project = Project::new(name);
        project.description = description;
        project.roadmap.vision = vision;
        let message = format!("Created project '{name}'");
        project.log(project.created_at, "create_project", &message);
        self.store.replace(name, &project)?;
        tracing::debug!(project = name, "project created");
        Ok(ProjectCreated {
            success: true,
            project,
            message,
        })
    }

    // ---------------------------------------------------------------------------
    // Commit path
    // ---------------------------------------------------------------------------

    /// Load `name`, apply `op`, validate, log and persist.
    ///
    /// `op` is responsible for calling [`invariants::restore`] after its
    /// structural change; validation afterwards rejects anything it missed.
    fn commit<T: Outcome>(
        &self,
        name: &str,
        action: &str,
        op: impl FnOnce(&mut Project, DateTime<Utc>) -> Result<T>,
    ) -> Result<T> {
        let mut project = self.project(name)?;
        let now = Utc::now();
        let outcome = op(&mut project, now)?;
        invariants::validate(&project)?;
        project.updated_at = now;
        project.log(now, action, outcome.message());
        self.store.replace(name, &project)?;
        tracing::debug!(project = name, action, "committed");
        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::phase::PhaseSpec;
    use crate::sprint::SprintSpec;
    use crate::store::PrivateStore;
    use tempfile::TempDir;

    pub fn engine() -> (TempDir, Engine) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(PrivateStore::new(dir.path()));
        (dir, Engine::new(store))
    }

    pub fn phase_spec(name: &str) -> PhaseSpec {
        PhaseSpec {
            phase_name: name.into(),
            ..Default::default()
        }
    }

    pub fn sprint_spec(name: &str) -> SprintSpec {
        SprintSpec {
            sprint_name: name.into(),
            goal: None,
        }
    }

    /// Project "alpha" with phases named `phases`, each holding `sprints[i]` sprints.
    /// Returns the phase ids in order.
    pub fn seeded(engine: &Engine, phases: &[(&str, usize)]) -> Vec<String> {
        engine.create_project("alpha", None, None).unwrap();
        let mut ids = Vec::new();
        for (name, sprint_count) in phases {
            let inserted = engine
                .insert_phase("alpha", phase_spec(name), None)
                .unwrap();
            for n in 0..*sprint_count {
                engine
                    .insert_sprint(
                        "alpha",
                        &inserted.phase.id,
                        sprint_spec(&format!("{name}-S{}", n + 1)),
                        None,
                    )
                    .unwrap();
            }
            ids.push(inserted.phase.id);
        }
        ids
    }

    pub fn sprint_numbers(project: &Project, phase_index: usize) -> Vec<u32> {
        project.roadmap.phases[phase_index]
            .sprints
            .iter()
            .map(|s| s.sprint_number)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn create_project_rejects_duplicates_and_bad_names() {
        let (_dir, engine) = engine();
        engine.create_project("alpha", None, None).unwrap();
        assert!(matches!(
            engine.create_project("alpha", None, None),
            Err(PdlError::ProjectExists(_))
        ));
        assert!(matches!(
            engine.create_project("Not Valid", None, None),
            Err(PdlError::InvalidName(_))
        ));
    }

    #[test]
    fn missing_project_is_not_found() {
        let (_dir, engine) = engine();
        let err = engine
            .insert_phase("ghost", phase_spec("A"), None)
            .unwrap_err();
        assert!(matches!(err, PdlError::ProjectNotFound(_)));
    }

    #[test]
    fn every_commit_appends_activity() {
        let (_dir, engine) = engine();
        seeded(&engine, &[("A", 1)]);
        let project = engine.project("alpha").unwrap();
        let actions: Vec<&str> = project.activity.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(actions, ["create_project", "insert_phase", "insert_sprint"]);
    }

    #[test]
    fn failed_operation_writes_nothing() {
        let (_dir, engine) = engine();
        seeded(&engine, &[("A", 2)]);
        let before = engine.project("alpha").unwrap();
        assert!(engine.delete_phase("alpha", "phase_missing", None).is_err());
        assert_eq!(engine.project("alpha").unwrap(), before);
    }

    #[test]
    fn list_projects_reads_through_store() {
        let (_dir, engine) = engine();
        engine.create_project("beta", None, None).unwrap();
        engine.create_project("alpha", None, None).unwrap();
        assert_eq!(engine.list_projects().unwrap(), ["alpha", "beta"]);
    }
}
