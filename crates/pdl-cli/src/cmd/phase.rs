use crate::context;
use crate::output::print_outcome;
use anyhow::Context;
use clap::Subcommand;
use pdl_core::phase::PhaseSpec;
use pdl_core::types::PhaseStatus;
use std::path::Path;

#[derive(Subcommand)]
pub enum PhaseSubcommand {
    /// Insert a phase (appends if no position is given)
    Insert {
        project: String,
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        objective: Option<String>,
        /// Duration in weeks (defaults to defaults.phase_duration_weeks)
        #[arg(long)]
        weeks: Option<u32>,
        /// Insert at position N (0-based)
        #[arg(long, value_name = "N")]
        position: Option<usize>,
        /// Deliverable (repeatable)
        #[arg(long = "deliverable")]
        deliverables: Vec<String>,
        /// Success metric (repeatable)
        #[arg(long = "metric")]
        success_metrics: Vec<String>,
    },
    /// Delete a phase; its sprints are discarded unless --reassign-to is given
    Delete {
        project: String,
        phase_id: String,
        #[arg(long, value_name = "PHASE_ID")]
        reassign_to: Option<String>,
    },
    /// Reorder phases; omitted phases keep their order at the end
    Reorder {
        project: String,
        /// Phase ids in desired order
        ids: Vec<String>,
    },
    /// Set a phase's status (not_started, in_progress, completed, blocked)
    Status {
        project: String,
        phase_id: String,
        status: String,
        /// Completion percentage, for phases without sprints
        #[arg(long)]
        completion: Option<u8>,
    },
}

pub fn run(root: &Path, subcmd: PhaseSubcommand, json: bool) -> anyhow::Result<()> {
    let ws = context::open(root)?;
    match subcmd {
        PhaseSubcommand::Insert {
            project,
            name,
            description,
            objective,
            weeks,
            position,
            deliverables,
            success_metrics,
        } => {
            let spec = PhaseSpec {
                phase_name: name,
                description,
                objective,
                duration_weeks: weeks,
                deliverables,
                success_metrics,
            };
            let inserted = ws
                .engine
                .insert_phase(&project, spec, position)
                .with_context(|| format!("failed to insert phase into '{project}'"))?;
            if json {
                return print_outcome(&inserted, &inserted.message, json);
            }
            println!("{}", inserted.message);
            println!("  id: {}", inserted.phase.id);
            Ok(())
        }
        PhaseSubcommand::Delete {
            project,
            phase_id,
            reassign_to,
        } => {
            let deleted = ws
                .engine
                .delete_phase(&project, &phase_id, reassign_to.as_deref())
                .with_context(|| format!("failed to delete phase '{phase_id}'"))?;
            print_outcome(&deleted, &deleted.message, json)
        }
        PhaseSubcommand::Reorder { project, ids } => {
            let reordered = ws
                .engine
                .reorder_phases(&project, &ids)
                .with_context(|| format!("failed to reorder phases of '{project}'"))?;
            print_outcome(&reordered, &reordered.message, json)
        }
        PhaseSubcommand::Status {
            project,
            phase_id,
            status,
            completion,
        } => {
            let status: PhaseStatus = status.parse()?;
            let updated = ws
                .engine
                .set_phase_status(&project, &phase_id, status, completion)
                .with_context(|| format!("failed to update phase '{phase_id}'"))?;
            print_outcome(&updated, &updated.message, json)
        }
    }
}
