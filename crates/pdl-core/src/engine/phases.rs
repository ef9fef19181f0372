use serde::{Deserialize, Serialize};

use super::invariants::{self, reorder_by_ids};
use super::{Engine, Outcome, Reordered};
use crate::error::{PdlError, Result};
use crate::phase::{Phase, PhaseSpec};
use crate::types::PhaseStatus;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseInserted {
    pub success: bool,
    pub phase: Phase,
    pub position: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseDeleted {
    pub success: bool,
    pub phase_id: String,
    pub phase_name: String,
    /// Sprints moved into `reassigned_to`.
    pub sprints_reassigned: usize,
    /// Sprints deleted along with the phase because no destination was given.
    pub sprints_discarded: usize,
    pub reassigned_to: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseUpdated {
    pub success: bool,
    pub phase: Phase,
    pub message: String,
}

impl Outcome for PhaseInserted {
    fn message(&self) -> &str {
        &self.message
    }
}

impl Outcome for PhaseDeleted {
    fn message(&self) -> &str {
        &self.message
    }
}

impl Outcome for PhaseUpdated {
    fn message(&self) -> &str {
        &self.message
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

impl Engine {
    /// Splice a new phase in at `position` (clamped; end of list when `None`)
    /// and re-chain the dates of every phase.
    pub fn insert_phase(
        &self,
        project: &str,
        spec: PhaseSpec,
        position: Option<usize>,
    ) -> Result<PhaseInserted> {
        self.commit(project, "insert_phase", |p, now| {
            let phase = Phase::from_spec(spec, self.default_phase_weeks);
            let phases = &mut p.roadmap.phases;
            let at = position.unwrap_or(phases.len()).min(phases.len());
            phases.insert(at, phase);

            invariants::restore(p, now);

            let phase = p.roadmap.phases[at].clone();
            Ok(PhaseInserted {
                success: true,
                message: format!("Inserted phase '{}' at position {}", phase.phase_name, at),
                phase,
                position: at,
            })
        })
    }

    /// Remove a phase. Its sprints move to `reassign_to` when given (appended
    /// in order), otherwise they are discarded and counted as such.
    pub fn delete_phase(
        &self,
        project: &str,
        phase_id: &str,
        reassign_to: Option<&str>,
    ) -> Result<PhaseDeleted> {
        self.commit(project, "delete_phase", |p, now| {
            let idx = p.phase_index(phase_id)?;
            if let Some(dest) = reassign_to {
                if dest == phase_id {
                    return Err(PdlError::InvariantViolation(format!(
                        "cannot reassign sprints of phase '{phase_id}' to itself"
                    )));
                }
                p.phase_index(dest)?;
            }

            let mut removed = p.roadmap.phases.remove(idx);
            let orphans = std::mem::take(&mut removed.sprints);
            let count = orphans.len();

            let (reassigned, discarded, dest_name) = match reassign_to {
                Some(dest) => {
                    let di = p.phase_index(dest)?;
                    let target = &mut p.roadmap.phases[di];
                    for mut sprint in orphans {
                        sprint.phase_id = target.id.clone();
                        target.sprints.push(sprint);
                    }
                    (count, 0, Some(target.phase_name.clone()))
                }
                None => (0, count, None),
            };

            for milestone in &mut p.roadmap.milestones {
                if milestone.phase_id.as_deref() == Some(phase_id) {
                    milestone.phase_id = reassign_to.map(str::to_string);
                }
            }

            invariants::restore(p, now);

            let message = match (dest_name, discarded) {
                (Some(dest), _) if reassigned > 0 => format!(
                    "Deleted phase '{}'; reassigned {reassigned} sprint(s) to '{dest}'",
                    removed.phase_name
                ),
                (_, n) if n > 0 => format!(
                    "Deleted phase '{}'; discarded {n} sprint(s)",
                    removed.phase_name
                ),
                _ => format!("Deleted phase '{}'", removed.phase_name),
            };
            if discarded > 0 {
                tracing::info!(
                    project = p.name.as_str(),
                    phase = removed.phase_name.as_str(),
                    discarded,
                    "phase deleted without reassignment target"
                );
            }

            Ok(PhaseDeleted {
                success: true,
                phase_id: removed.id,
                phase_name: removed.phase_name,
                sprints_reassigned: reassigned,
                sprints_discarded: discarded,
                reassigned_to: reassign_to.map(str::to_string),
                message,
            })
        })
    }

    /// Reorder the whole phase list. Phases missing from `order` keep their
    /// relative order at the end; unknown ids are ignored.
    pub fn reorder_phases(&self, project: &str, order: &[String]) -> Result<Reordered> {
        self.commit(project, "reorder_phases", |p, now| {
            let current = std::mem::take(&mut p.roadmap.phases);
            let reordering = reorder_by_ids(current, order, |ph| ph.id.as_str());
            p.roadmap.phases = reordering.items;

            invariants::restore(p, now);

            let mut message = format!("Reordered {} phase(s)", p.roadmap.phases.len());
            if !reordering.appended.is_empty() {
                message.push_str(&format!(
                    "; {} not listed kept at the end",
                    reordering.appended.len()
                ));
            }
            Ok(Reordered {
                success: true,
                order: p.roadmap.phases.iter().map(|ph| ph.id.clone()).collect(),
                appended: reordering.appended,
                ignored: reordering.ignored,
                message,
            })
        })
    }

    /// Change a phase's status. Completing a phase records the completion
    /// moment as its end date, which then anchors the date chain.
    pub fn set_phase_status(
        &self,
        project: &str,
        phase_id: &str,
        status: PhaseStatus,
        completion: Option<u8>,
    ) -> Result<PhaseUpdated> {
        self.commit(project, "set_phase_status", |p, now| {
            let idx = p.phase_index(phase_id)?;
            let phase = &mut p.roadmap.phases[idx];
            let was_completed = phase.status == PhaseStatus::Completed;
            phase.status = status;
            if status == PhaseStatus::Completed {
                if !was_completed || phase.end_date.is_none() {
                    phase.end_date = Some(now);
                }
                if phase.start_date.map(|s| s > now).unwrap_or(true) {
                    phase.start_date = Some(now);
                }
            } else if let Some(c) = completion {
                phase.completion = c.min(100);
            }

            invariants::restore(p, now);

            let phase = p.roadmap.phases[idx].clone();
            Ok(PhaseUpdated {
                success: true,
                message: format!("Phase '{}' is now {}", phase.phase_name, phase.status),
                phase,
            })
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
