use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::invariants;
use super::{Engine, Outcome};
use crate::cycle::{PdlCycle, StageState, StageUpdate};
use crate::error::Result;
use crate::project::Milestone;
use crate::task::{Task, TaskSpec};
use crate::types::{PdlStage, TaskStatus};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleInserted {
    pub success: bool,
    pub cycle: PdlCycle,
    pub sprint_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageUpdated {
    pub success: bool,
    pub cycle_id: String,
    pub stage: StageState,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInserted {
    pub success: bool,
    pub task: Task,
    pub cycle_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskUpdated {
    pub success: bool,
    pub task: Task,
    pub sprint_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneAdded {
    pub success: bool,
    pub milestone: Milestone,
    pub message: String,
}

impl Outcome for CycleInserted {
    fn message(&self) -> &str {
        &self.message
    }
}

impl Outcome for StageUpdated {
    fn message(&self) -> &str {
        &self.message
    }
}

impl Outcome for TaskInserted {
    fn message(&self) -> &str {
        &self.message
    }
}

impl Outcome for TaskUpdated {
    fn message(&self) -> &str {
        &self.message
    }
}

impl Outcome for MilestoneAdded {
    fn message(&self) -> &str {
        &self.message
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

impl Engine {
    /// Append a fresh seven-stage cycle to a sprint.
    pub fn insert_cycle(&self, project: &str, sprint_id: &str) -> Result<CycleInserted> {
        self.commit(project, "insert_cycle", |p, now| {
            let (pi, si) = p.locate_sprint(sprint_id)?;
            let sprint = &mut p.roadmap.phases[pi].sprints[si];
            sprint.cycles.push(PdlCycle::new());
            let ci = sprint.cycles.len() - 1;

            invariants::restore(p, now);

            let sprint = &p.roadmap.phases[pi].sprints[si];
            let cycle = sprint.cycles[ci].clone();
            Ok(CycleInserted {
                success: true,
                message: format!(
                    "Opened cycle #{} in sprint '{}'",
                    cycle.cycle_number, sprint.sprint_name
                ),
                sprint_id: sprint.id.clone(),
                cycle,
            })
        })
    }

    pub fn update_stage(
        &self,
        project: &str,
        cycle_id: &str,
        stage: PdlStage,
        update: StageUpdate,
    ) -> Result<StageUpdated> {
        self.commit(project, "update_stage", |p, now| {
            let (pi, si, ci) = p.locate_cycle(cycle_id)?;
            let cycle = &mut p.roadmap.phases[pi].sprints[si].cycles[ci];
            cycle.apply_stage_update(stage, update);
            let state = cycle.stage_mut(stage).clone();

            invariants::restore(p, now);

            Ok(StageUpdated {
                success: true,
                message: format!(
                    "{} stage is {} ({}%)",
                    stage.label(),
                    state.status,
                    state.completion
                ),
                cycle_id: cycle_id.to_string(),
                stage: state,
            })
        })
    }

    /// Add a task to a cycle and record a burn-down point on its sprint.
    pub fn insert_task(
        &self,
        project: &str,
        cycle_id: &str,
        spec: TaskSpec,
    ) -> Result<TaskInserted> {
        self.commit(project, "insert_task", |p, now| {
            let (pi, si, ci) = p.locate_cycle(cycle_id)?;
            let task = Task::from_spec(spec);
            let sprint = &mut p.roadmap.phases[pi].sprints[si];
            sprint.cycles[ci].tasks.push(task.clone());
            sprint.record_burndown(now);

            invariants::restore(p, now);

            Ok(TaskInserted {
                success: true,
                message: format!("Added task '{}'", task.description),
                cycle_id: cycle_id.to_string(),
                task,
            })
        })
    }

    /// Add a task to the latest cycle of a sprint, opening cycle 1 when the
    /// sprint has none.
    pub fn insert_sprint_task(
        &self,
        project: &str,
        sprint_id: &str,
        spec: TaskSpec,
    ) -> Result<TaskInserted> {
        self.commit(project, "insert_task", |p, now| {
            let (pi, si) = p.locate_sprint(sprint_id)?;
            let task = Task::from_spec(spec);
            let sprint = &mut p.roadmap.phases[pi].sprints[si];
            if sprint.cycles.is_empty() {
                sprint.cycles.push(PdlCycle::new());
            }
            let ci = sprint.cycles.len() - 1;
            sprint.cycles[ci].tasks.push(task.clone());
            sprint.record_burndown(now);
            let cycle_id = sprint.cycles[ci].id.clone();

            invariants::restore(p, now);

            Ok(TaskInserted {
                success: true,
                message: format!("Added task '{}'", task.description),
                cycle_id,
                task,
            })
        })
    }

    /// Change a task's status. The owning sprint gets a burn-down point and
    /// its velocity is recomputed.
    pub fn set_task_status(
        &self,
        project: &str,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<TaskUpdated> {
        self.commit(project, "set_task_status", |p, now| {
            let (pi, si, ci, ti) = p.locate_task(task_id)?;
            let sprint = &mut p.roadmap.phases[pi].sprints[si];
            sprint.cycles[ci].tasks[ti].set_status(status);
            sprint.record_burndown(now);

            invariants::restore(p, now);

            let sprint = &p.roadmap.phases[pi].sprints[si];
            let task = sprint.cycles[ci].tasks[ti].clone();
            Ok(TaskUpdated {
                success: true,
                message: format!("Task '{}' is now {}", task.description, task.status),
                sprint_id: sprint.id.clone(),
                task,
            })
        })
    }

    pub fn add_milestone(
        &self,
        project: &str,
        name: &str,
        target_date: Option<DateTime<Utc>>,
        phase_id: Option<&str>,
    ) -> Result<MilestoneAdded> {
        self.commit(project, "add_milestone", |p, _now| {
            if let Some(id) = phase_id {
                p.phase_index(id)?;
            }
            let milestone = Milestone {
                id: crate::new_id("milestone"),
                name: name.to_string(),
                target_date,
                phase_id: phase_id.map(str::to_string),
                achieved: false,
            };
            p.roadmap.milestones.push(milestone.clone());
            Ok(MilestoneAdded {
                success: true,
                message: format!("Added milestone '{name}'"),
                milestone,
            })
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::*;
    use crate::error::PdlError;
    use crate::types::StageStatus;

    fn first_sprint(engine: &Engine) -> String {
        engine.project("alpha").unwrap().roadmap.phases[0].sprints[0]
            .id
            .clone()
    }

    fn task(description: &str, points: u32) -> TaskSpec {
        TaskSpec {
            description: description.into(),
            assignee: None,
            story_points: points,
        }
    }

    #[test]
    fn cycles_number_within_sprint() {
        let (_dir, engine) = engine();
        seeded(&engine, &[("A", 1)]);
        let sprint = first_sprint(&engine);

        let one = engine.insert_cycle("alpha", &sprint).unwrap();
        let two = engine.insert_cycle("alpha", &sprint).unwrap();
        assert_eq!(one.cycle.cycle_number, 1);
        assert_eq!(two.cycle.cycle_number, 2);
        assert_eq!(two.cycle.stages.len(), 7);
        assert!(two
            .cycle
            .stages
            .iter()
            .all(|s| s.status == StageStatus::NotStarted));
    }

    #[test]
    fn stage_update_completes_and_advances() {
        let (_dir, engine) = engine();
        seeded(&engine, &[("A", 1)]);
        let cycle = engine.insert_cycle("alpha", &first_sprint(&engine)).unwrap();

        let updated = engine
            .update_stage(
                "alpha",
                &cycle.cycle.id,
                PdlStage::Discovery,
                StageUpdate {
                    status: Some(StageStatus::Completed),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.stage.completion, 100);

        let project = engine.project("alpha").unwrap();
        let stored = &project.roadmap.phases[0].sprints[0].cycles[0];
        assert_eq!(stored.current_stage(), Some(PdlStage::Definition));
    }

    #[test]
    fn task_status_updates_burndown_and_velocity() {
        let (_dir, engine) = engine();
        seeded(&engine, &[("A", 1)]);
        let cycle = engine.insert_cycle("alpha", &first_sprint(&engine)).unwrap();
        let small = engine
            .insert_task("alpha", &cycle.cycle.id, task("wire up", 3))
            .unwrap();
        engine
            .insert_task("alpha", &cycle.cycle.id, task("ship it", 5))
            .unwrap();

        let done = engine
            .set_task_status("alpha", &small.task.id, TaskStatus::Done)
            .unwrap();
        assert!(done.task.completed_at.is_some());

        let project = engine.project("alpha").unwrap();
        let sprint = &project.roadmap.phases[0].sprints[0];
        assert_eq!(sprint.velocity, 3);
        let remaining: Vec<u32> = sprint.burndown.iter().map(|b| b.remaining_points).collect();
        assert_eq!(remaining, [3, 8, 5]);
    }

    #[test]
    fn sprint_task_opens_first_cycle_then_reuses_latest() {
        let (_dir, engine) = engine();
        seeded(&engine, &[("A", 1)]);
        let sprint = first_sprint(&engine);

        let first = engine
            .insert_sprint_task("alpha", &sprint, task("one", 1))
            .unwrap();
        let second = engine.insert_cycle("alpha", &sprint).unwrap();
        let third = engine
            .insert_sprint_task("alpha", &sprint, task("two", 2))
            .unwrap();
        assert_ne!(first.cycle_id, third.cycle_id);
        assert_eq!(third.cycle_id, second.cycle.id);

        let project = engine.project("alpha").unwrap();
        let cycles = &project.roadmap.phases[0].sprints[0].cycles;
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0].tasks.len(), 1);
        assert_eq!(cycles[1].tasks[0].description, "two");
    }

    #[test]
    fn unknown_cycle_and_task_are_not_found() {
        let (_dir, engine) = engine();
        seeded(&engine, &[("A", 1)]);
        assert!(matches!(
            engine.insert_task("alpha", "cycle_ghost", task("x", 1)),
            Err(PdlError::CycleNotFound(_))
        ));
        assert!(matches!(
            engine.set_task_status("alpha", "task_ghost", TaskStatus::Done),
            Err(PdlError::TaskNotFound(_))
        ));
    }

    #[test]
    fn milestone_requires_existing_phase() {
        let (_dir, engine) = engine();
        let ids = seeded(&engine, &[("A", 0)]);
        assert!(matches!(
            engine.add_milestone("alpha", "GA", None, Some("phase_ghost")),
            Err(PdlError::PhaseNotFound(_))
        ));
        let added = engine
            .add_milestone("alpha", "GA", None, Some(&ids[0]))
            .unwrap();
        assert_eq!(added.milestone.phase_id.as_deref(), Some(ids[0].as_str()));
        assert_eq!(engine.project("alpha").unwrap().roadmap.milestones.len(), 1);
    }
}
