//! Compatibility layer for callers that still speak the older vocabulary.
//!
//! | legacy     | canonical |
//! |------------|-----------|
//! | repository | project   |
//! | project    | phase     |
//! | phase      | sprint    |
//! | step       | task      |
//!
//! Every method translates its inputs and forwards to exactly one engine
//! operation; results come back in canonical form.

use crate::engine::{
    Engine, PhaseDeleted, PhaseInserted, Reordered, SprintDeleted, SprintInserted, SprintMove,
    SprintsMoved, TaskInserted,
};
use crate::error::Result;
use crate::phase::PhaseSpec;
use crate::sprint::SprintSpec;
use crate::task::TaskSpec;
use serde::{Deserialize, Serialize};

/// A legacy "project" (a phase).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LegacyProjectSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default)]
    pub duration_weeks: Option<u32>,
}

impl From<LegacyProjectSpec> for PhaseSpec {
    fn from(spec: LegacyProjectSpec) -> Self {
        PhaseSpec {
            phase_name: spec.name,
            description: spec.description,
            objective: spec.objective,
            duration_weeks: spec.duration_weeks,
            ..Default::default()
        }
    }
}

/// A legacy "phase" (a sprint).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LegacyPhaseSpec {
    pub name: String,
    #[serde(default)]
    pub goal: Option<String>,
}

impl From<LegacyPhaseSpec> for SprintSpec {
    fn from(spec: LegacyPhaseSpec) -> Self {
        SprintSpec {
            sprint_name: spec.name,
            goal: spec.goal,
        }
    }
}

/// A legacy "step" (a task).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepSpec {
    pub description: String,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub story_points: u32,
}

impl From<StepSpec> for TaskSpec {
    fn from(spec: StepSpec) -> Self {
        TaskSpec {
            description: spec.description,
            assignee: spec.assignee,
            story_points: spec.story_points,
        }
    }
}

pub struct LegacyAdapter<'a> {
    engine: &'a Engine,
}

impl<'a> LegacyAdapter<'a> {
    pub fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    pub fn insert_project(
        &self,
        repository: &str,
        spec: LegacyProjectSpec,
        position: Option<usize>,
    ) -> Result<PhaseInserted> {
        self.engine.insert_phase(repository, spec.into(), position)
    }

    pub fn delete_project(
        &self,
        repository: &str,
        project_id: &str,
        reassign_to: Option<&str>,
    ) -> Result<PhaseDeleted> {
        self.engine.delete_phase(repository, project_id, reassign_to)
    }

    pub fn reorder_projects(&self, repository: &str, order: &[String]) -> Result<Reordered> {
        self.engine.reorder_phases(repository, order)
    }

    pub fn insert_phase(
        &self,
        repository: &str,
        project_id: &str,
        spec: LegacyPhaseSpec,
        position: Option<usize>,
    ) -> Result<SprintInserted> {
        self.engine
            .insert_sprint(repository, project_id, spec.into(), position)
    }

    pub fn delete_phase(
        &self,
        repository: &str,
        phase_id: &str,
        reassign_to: Option<&str>,
    ) -> Result<SprintDeleted> {
        self.engine.delete_sprint(repository, phase_id, reassign_to)
    }

    /// Move a legacy phase into another legacy project.
    pub fn move_phase(
        &self,
        repository: &str,
        phase_id: &str,
        to_project_id: &str,
        position: Option<usize>,
    ) -> Result<SprintsMoved> {
        self.engine.reorder_sprints(
            repository,
            &[SprintMove {
                sprint_id: phase_id.to_string(),
                to_phase_id: Some(to_project_id.to_string()),
                position,
            }],
        )
    }

    /// Steps land in the latest cycle of the sprint.
    pub fn add_step(&self, repository: &str, phase_id: &str, spec: StepSpec) -> Result<TaskInserted> {
        self.engine
            .insert_sprint_task(repository, phase_id, spec.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::engine;
    use crate::error::PdlError;

    fn legacy_project(name: &str) -> LegacyProjectSpec {
        LegacyProjectSpec {
            name: name.into(),
            ..Default::default()
        }
    }

    fn legacy_phase(name: &str) -> LegacyPhaseSpec {
        LegacyPhaseSpec {
            name: name.into(),
            goal: None,
        }
    }

    #[test]
    fn legacy_calls_map_onto_canonical_model() {
        let (_dir, engine) = engine();
        engine.create_project("repo", None, None).unwrap();
        let legacy = LegacyAdapter::new(&engine);

        let web = legacy.insert_project("repo", legacy_project("web"), None).unwrap();
        let api = legacy.insert_project("repo", legacy_project("api"), None).unwrap();
        let p1 = legacy
            .insert_phase("repo", &web.phase.id, legacy_phase("p1"), None)
            .unwrap();
        legacy
            .insert_phase("repo", &web.phase.id, legacy_phase("p2"), None)
            .unwrap();

        legacy
            .move_phase("repo", &p1.sprint.id, &api.phase.id, None)
            .unwrap();
        let step = legacy
            .add_step(
                "repo",
                &p1.sprint.id,
                StepSpec {
                    description: "write docs".into(),
                    ..Default::default()
                },
            )
            .unwrap();

        let project = engine.project("repo").unwrap();
        let phases = &project.roadmap.phases;
        assert_eq!(phases[0].sprints.len(), 1);
        assert_eq!(phases[0].sprints[0].sprint_number, 1);
        let moved = &phases[1].sprints[0];
        assert_eq!(moved.id, p1.sprint.id);
        assert_eq!(moved.cycles[0].id, step.cycle_id);
        assert_eq!(moved.cycles[0].tasks[0].description, "write docs");
    }

    #[test]
    fn legacy_delete_and_reorder() {
        let (_dir, engine) = engine();
        engine.create_project("repo", None, None).unwrap();
        let legacy = LegacyAdapter::new(&engine);
        let a = legacy.insert_project("repo", legacy_project("a"), None).unwrap();
        let b = legacy.insert_project("repo", legacy_project("b"), None).unwrap();
        legacy
            .insert_phase("repo", &a.phase.id, legacy_phase("only"), None)
            .unwrap();

        let reordered = legacy
            .reorder_projects("repo", &[b.phase.id.clone()])
            .unwrap();
        assert_eq!(reordered.order, [b.phase.id.clone(), a.phase.id.clone()]);

        let deleted = legacy
            .delete_project("repo", &a.phase.id, Some(&b.phase.id))
            .unwrap();
        assert_eq!(deleted.sprints_reassigned, 1);

        let project = engine.project("repo").unwrap();
        let sprint_id = project.roadmap.phases[0].sprints[0].id.clone();
        let gone = legacy.delete_phase("repo", &sprint_id, None).unwrap();
        assert_eq!(gone.cycles_discarded, 0);
        assert!(matches!(
            legacy.delete_phase("repo", &sprint_id, None),
            Err(PdlError::SprintNotFound(_))
        ));
    }
}
