use serde::{Deserialize, Serialize};

use super::invariants::{self, renumber_sprints, reorder_by_ids};
use super::{Engine, Outcome, Reordered};
use crate::error::{PdlError, Result};
use crate::sprint::{Sprint, SprintSpec};
use crate::types::SprintStatus;

// ---------------------------------------------------------------------------
// Inputs and results
// ---------------------------------------------------------------------------

/// Point-to-point move of one sprint, possibly into another phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintMove {
    pub sprint_id: String,
    /// Destination phase; the sprint's current phase when absent.
    #[serde(default)]
    pub to_phase_id: Option<String>,
    /// 0-based index in the destination (clamped); end of list when absent.
    #[serde(default)]
    pub position: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintInserted {
    pub success: bool,
    pub sprint: Sprint,
    pub phase_id: String,
    pub position: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintDeleted {
    pub success: bool,
    pub sprint_id: String,
    pub sprint_name: String,
    pub phase_id: String,
    pub cycles_reassigned: usize,
    pub cycles_discarded: usize,
    pub reassigned_to: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintsMoved {
    pub success: bool,
    pub moved: Vec<String>,
    /// Every phase that lost or gained a sprint; all were renumbered.
    pub phases_touched: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintUpdated {
    pub success: bool,
    pub sprint: Sprint,
    pub message: String,
}

impl Outcome for SprintInserted {
    fn message(&self) -> &str {
        &self.message
    }
}

impl Outcome for SprintDeleted {
    fn message(&self) -> &str {
        &self.message
    }
}

impl Outcome for SprintsMoved {
    fn message(&self) -> &str {
        &self.message
    }
}

impl Outcome for SprintUpdated {
    fn message(&self) -> &str {
        &self.message
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

impl Engine {
    /// Splice a new sprint into a phase and renumber the whole phase.
    pub fn insert_sprint(
        &self,
        project: &str,
        phase_id: &str,
        spec: SprintSpec,
        position: Option<usize>,
    ) -> Result<SprintInserted> {
        self.commit(project, "insert_sprint", |p, now| {
            let pi = p.phase_index(phase_id)?;
            let phase = &mut p.roadmap.phases[pi];
            let sprint = Sprint::from_spec(spec, phase.id.clone());
            let at = position
                .unwrap_or(phase.sprints.len())
                .min(phase.sprints.len());
            phase.sprints.insert(at, sprint);

            invariants::restore(p, now);

            let phase = &p.roadmap.phases[pi];
            let sprint = phase.sprints[at].clone();
            Ok(SprintInserted {
                success: true,
                message: format!(
                    "Inserted sprint '{}' as #{} in phase '{}'",
                    sprint.sprint_name, sprint.sprint_number, phase.phase_name
                ),
                phase_id: phase.id.clone(),
                sprint,
                position: at,
            })
        })
    }

    /// Remove a sprint. Its cycles move to the sprint `reassign_to` when
    /// given, otherwise they are discarded and counted as such.
    pub fn delete_sprint(
        &self,
        project: &str,
        sprint_id: &str,
        reassign_to: Option<&str>,
    ) -> Result<SprintDeleted> {
        self.commit(project, "delete_sprint", |p, now| {
            let (pi, si) = p.locate_sprint(sprint_id)?;
            if let Some(dest) = reassign_to {
                if dest == sprint_id {
                    return Err(PdlError::InvariantViolation(format!(
                        "cannot reassign cycles of sprint '{sprint_id}' to itself"
                    )));
                }
                p.locate_sprint(dest)?;
            }

            let mut removed = p.roadmap.phases[pi].sprints.remove(si);
            let orphans = std::mem::take(&mut removed.cycles);
            let count = orphans.len();

            let (reassigned, discarded) = match reassign_to {
                Some(dest) => {
                    let (dpi, dsi) = p.locate_sprint(dest)?;
                    p.roadmap.phases[dpi].sprints[dsi].cycles.extend(orphans);
                    (count, 0)
                }
                None => (0, count),
            };

            invariants::restore(p, now);

            let message = if reassigned > 0 {
                format!(
                    "Deleted sprint '{}'; reassigned {reassigned} cycle(s)",
                    removed.sprint_name
                )
            } else if discarded > 0 {
                format!(
                    "Deleted sprint '{}'; discarded {discarded} cycle(s)",
                    removed.sprint_name
                )
            } else {
                format!("Deleted sprint '{}'", removed.sprint_name)
            };

            Ok(SprintDeleted {
                success: true,
                sprint_id: removed.id,
                sprint_name: removed.sprint_name,
                phase_id: removed.phase_id,
                cycles_reassigned: reassigned,
                cycles_discarded: discarded,
                reassigned_to: reassign_to.map(str::to_string),
                message,
            })
        })
    }

    /// Apply point-to-point moves in order. A move across phases updates the
    /// sprint's phase reference before insertion; source and destination are
    /// both renumbered.
    pub fn reorder_sprints(&self, project: &str, moves: &[SprintMove]) -> Result<SprintsMoved> {
        self.commit(project, "reorder_sprints", |p, now| {
            let mut moved = Vec::with_capacity(moves.len());
            let mut touched: Vec<String> = Vec::new();
            let mut touch = |id: &str| {
                if !touched.iter().any(|t| t == id) {
                    touched.push(id.to_string());
                }
            };

            for mv in moves {
                let (src, si) = p.locate_sprint(&mv.sprint_id)?;
                let dst = match &mv.to_phase_id {
                    Some(id) => p.phase_index(id)?,
                    None => src,
                };

                let mut sprint = p.roadmap.phases[src].sprints.remove(si);
                sprint.phase_id = p.roadmap.phases[dst].id.clone();
                let list = &mut p.roadmap.phases[dst].sprints;
                let at = mv.position.unwrap_or(list.len()).min(list.len());
                list.insert(at, sprint);

                renumber_sprints(&mut p.roadmap.phases[src].sprints);
                renumber_sprints(&mut p.roadmap.phases[dst].sprints);
                touch(&p.roadmap.phases[src].id);
                touch(&p.roadmap.phases[dst].id);
                moved.push(mv.sprint_id.clone());
            }

            invariants::restore(p, now);

            Ok(SprintsMoved {
                success: true,
                message: format!(
                    "Moved {} sprint(s) across {} phase(s)",
                    moved.len(),
                    touched.len()
                ),
                moved,
                phases_touched: touched,
            })
        })
    }

    /// Reorder the sprints of one phase by id. Sprints missing from `order`
    /// keep their relative order at the end.
    pub fn order_sprints(
        &self,
        project: &str,
        phase_id: &str,
        order: &[String],
    ) -> Result<Reordered> {
        self.commit(project, "order_sprints", |p, now| {
            let pi = p.phase_index(phase_id)?;
            let current = std::mem::take(&mut p.roadmap.phases[pi].sprints);
            let reordering = reorder_by_ids(current, order, |s| s.id.as_str());
            p.roadmap.phases[pi].sprints = reordering.items;

            invariants::restore(p, now);

            let phase = &p.roadmap.phases[pi];
            Ok(Reordered {
                success: true,
                order: phase.sprints.iter().map(|s| s.id.clone()).collect(),
                message: format!(
                    "Reordered {} sprint(s) in phase '{}'",
                    phase.sprints.len(),
                    phase.phase_name
                ),
                appended: reordering.appended,
                ignored: reordering.ignored,
            })
        })
    }

    pub fn set_sprint_status(
        &self,
        project: &str,
        sprint_id: &str,
        status: SprintStatus,
    ) -> Result<SprintUpdated> {
        self.commit(project, "set_sprint_status", |p, now| {
            let (pi, si) = p.locate_sprint(sprint_id)?;
            p.roadmap.phases[pi].sprints[si].status = status;

            invariants::restore(p, now);

            let sprint = p.roadmap.phases[pi].sprints[si].clone();
            Ok(SprintUpdated {
                success: true,
                message: format!("Sprint '{}' is now {}", sprint.sprint_name, sprint.status),
                sprint,
            })
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
