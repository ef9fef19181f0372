use crate::cycle::PdlCycle;
use crate::task::Task;
use crate::types::{SprintStatus, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurndownPoint {
    pub at: DateTime<Utc>,
    pub remaining_points: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprint {
    pub id: String,
    pub sprint_name: String,
    /// 1-based position inside the owning phase.
    pub sprint_number: u32,
    pub phase_id: String,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub status: SprintStatus,
    #[serde(default)]
    pub cycles: Vec<PdlCycle>,
    #[serde(default)]
    pub velocity: u32,
    #[serde(default)]
    pub burndown: Vec<BurndownPoint>,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied fields for a new sprint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SprintSpec {
    pub sprint_name: String,
    #[serde(default)]
    pub goal: Option<String>,
}

impl Sprint {
    pub fn from_spec(spec: SprintSpec, phase_id: impl Into<String>) -> Self {
        Self {
            id: crate::new_id("sprint"),
            sprint_name: spec.sprint_name,
            sprint_number: 0,
            phase_id: phase_id.into(),
            goal: spec.goal,
            status: SprintStatus::Planning,
            cycles: Vec::new(),
            velocity: 0,
            burndown: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.cycles.iter().flat_map(|c| c.tasks.iter())
    }

    /// Story points delivered by done tasks. Saturates at `u32::MAX`.
    pub fn completed_points(&self) -> u32 {
        self.tasks()
            .filter(|t| t.status == TaskStatus::Done)
            .fold(0, |acc, t| acc.saturating_add(t.story_points))
    }

    pub fn record_burndown(&mut self, at: DateTime<Utc>) {
        let remaining_points = crate::task::remaining_points(self.tasks());
        self.burndown.push(BurndownPoint {
            at,
            remaining_points,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskSpec;

    #[test]
    fn new_sprint_is_planning_and_unnumbered() {
        let s = Sprint::from_spec(
            SprintSpec {
                sprint_name: "S1".into(),
                goal: None,
            },
            "phase_1",
        );
        assert_eq!(s.status, SprintStatus::Planning);
        assert_eq!(s.sprint_number, 0);
        assert_eq!(s.phase_id, "phase_1");
    }

    #[test]
    fn burndown_tracks_remaining_points() {
        let mut s = Sprint::from_spec(
            SprintSpec {
                sprint_name: "S1".into(),
                goal: None,
            },
            "phase_1",
        );
        let mut cycle = PdlCycle::new();
        for points in [3, 5] {
            cycle.tasks.push(Task::from_spec(TaskSpec {
                description: "t".into(),
                assignee: None,
                story_points: points,
            }));
        }
        cycle.tasks[0].set_status(TaskStatus::Done);
        s.cycles.push(cycle);

        s.record_burndown(Utc::now());
        assert_eq!(s.burndown.last().unwrap().remaining_points, 5);
        assert_eq!(s.completed_points(), 3);
    }

    #[test]
    fn huge_point_totals_saturate() {
        let mut s = Sprint::from_spec(
            SprintSpec {
                sprint_name: "S1".into(),
                goal: None,
            },
            "phase_1",
        );
        let mut cycle = PdlCycle::new();
        for _ in 0..2 {
            let mut t = Task::from_spec(TaskSpec {
                description: "t".into(),
                assignee: None,
                story_points: 1 << 31,
            });
            t.set_status(TaskStatus::Done);
            cycle.tasks.push(t);
        }
        cycle.tasks.push(Task::from_spec(TaskSpec {
            description: "open".into(),
            assignee: None,
            story_points: u32::MAX,
        }));
        s.cycles.push(cycle);

        assert_eq!(s.completed_points(), u32::MAX);
        s.record_burndown(Utc::now());
        assert_eq!(s.burndown.last().unwrap().remaining_points, u32::MAX);
    }
}
