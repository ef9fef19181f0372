use crate::error::{PdlError, Result};
use crate::phase::Phase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub target_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub phase_id: Option<String>,
    #[serde(default)]
    pub achieved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub summary: String,
}

// ---------------------------------------------------------------------------
// Roadmap
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Roadmap {
    #[serde(default)]
    pub vision: Option<String>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    /// Array position is the sequencing source of truth.
    #[serde(default)]
    pub phases: Vec<Phase>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub overall_progress: u8,
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

/// The aggregate root. Loaded and replaced as a whole through the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub roadmap: Roadmap,
    #[serde(default)]
    pub activity: Vec<ActivityEntry>,
}

/// Position of a sprint: (phase index, sprint index).
pub type SprintPos = (usize, usize);

/// Position of a cycle: (phase index, sprint index, cycle index).
pub type CyclePos = (usize, usize, usize);

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            description: None,
            created_at: now,
            updated_at: now,
            roadmap: Roadmap::default(),
            activity: Vec::new(),
        }
    }

    pub fn log(&mut self, at: DateTime<Utc>, action: &str, summary: impl Into<String>) {
        self.activity.push(ActivityEntry {
            timestamp: at,
            action: action.to_string(),
            summary: summary.into(),
        });
    }

    // ---------------------------------------------------------------------------
    // Lookups
    // ---------------------------------------------------------------------------

    pub fn phase_index(&self, phase_id: &str) -> Result<usize> {
        self.roadmap
            .phases
            .iter()
            .position(|p| p.id == phase_id)
            .ok_or_else(|| PdlError::PhaseNotFound(phase_id.to_string()))
    }

    pub fn phase(&self, phase_id: &str) -> Result<&Phase> {
        let i = self.phase_index(phase_id)?;
        Ok(&self.roadmap.phases[i])
    }

    pub fn locate_sprint(&self, sprint_id: &str) -> Result<SprintPos> {
        for (pi, phase) in self.roadmap.phases.iter().enumerate() {
            if let Some(si) = phase.sprints.iter().position(|s| s.id == sprint_id) {
                return Ok((pi, si));
            }
        }
        Err(PdlError::SprintNotFound(sprint_id.to_string()))
    }

    pub fn locate_cycle(&self, cycle_id: &str) -> Result<CyclePos> {
        for (pi, phase) in self.roadmap.phases.iter().enumerate() {
            for (si, sprint) in phase.sprints.iter().enumerate() {
                if let Some(ci) = sprint.cycles.iter().position(|c| c.id == cycle_id) {
                    return Ok((pi, si, ci));
                }
            }
        }
        Err(PdlError::CycleNotFound(cycle_id.to_string()))
    }

    /// Returns (phase, sprint, cycle, task) indices.
    pub fn locate_task(&self, task_id: &str) -> Result<(usize, usize, usize, usize)> {
        for (pi, phase) in self.roadmap.phases.iter().enumerate() {
            for (si, sprint) in phase.sprints.iter().enumerate() {
                for (ci, cycle) in sprint.cycles.iter().enumerate() {
                    if let Some(ti) = cycle.tasks.iter().position(|t| t.id == task_id) {
                        return Ok((pi, si, ci, ti));
                    }
                }
            }
        }
        Err(PdlError::TaskNotFound(task_id.to_string()))
    }

    pub fn sprint_count(&self) -> usize {
        self.roadmap.phases.iter().map(|p| p.sprints.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::PhaseSpec;
    use crate::sprint::{Sprint, SprintSpec};

    #[test]
    fn lookups_report_typed_not_found() {
        let p = Project::new("alpha");
        assert!(matches!(p.phase_index("x"), Err(PdlError::PhaseNotFound(_))));
        assert!(matches!(p.locate_sprint("x"), Err(PdlError::SprintNotFound(_))));
        assert!(matches!(p.locate_cycle("x"), Err(PdlError::CycleNotFound(_))));
        assert!(matches!(p.locate_task("x"), Err(PdlError::TaskNotFound(_))));
    }

    #[test]
    fn locate_sprint_finds_nested_position() {
        let mut p = Project::new("alpha");
        for name in ["A", "B"] {
            p.roadmap.phases.push(Phase::from_spec(
                PhaseSpec {
                    phase_name: name.into(),
                    ..Default::default()
                },
                2,
            ));
        }
        let b_id = p.roadmap.phases[1].id.clone();
        let sprint = Sprint::from_spec(
            SprintSpec {
                sprint_name: "S1".into(),
                goal: None,
            },
            b_id,
        );
        let sid = sprint.id.clone();
        p.roadmap.phases[1].sprints.push(sprint);

        assert_eq!(p.locate_sprint(&sid).unwrap(), (1, 0));
        assert_eq!(p.sprint_count(), 1);
    }

    #[test]
    fn yaml_round_trip_keeps_phase_order() {
        let mut p = Project::new("alpha");
        for name in ["C", "A", "B"] {
            p.roadmap.phases.push(Phase::from_spec(
                PhaseSpec {
                    phase_name: name.into(),
                    ..Default::default()
                },
                1,
            ));
        }
        let yaml = serde_yaml::to_string(&p).unwrap();
        let back: Project = serde_yaml::from_str(&yaml).unwrap();
        let names: Vec<&str> = back
            .roadmap
            .phases
            .iter()
            .map(|ph| ph.phase_name.as_str())
            .collect();
        assert_eq!(names, ["C", "A", "B"]);
    }
}
