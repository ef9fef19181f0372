use crate::context;
use crate::output::print_outcome;
use anyhow::Context;
use clap::Subcommand;
use pdl_core::engine::SprintMove;
use pdl_core::sprint::SprintSpec;
use pdl_core::types::SprintStatus;
use std::path::Path;

#[derive(Subcommand)]
pub enum SprintSubcommand {
    /// Insert a sprint into a phase (appends if no position is given)
    Insert {
        project: String,
        phase_id: String,
        name: String,
        #[arg(long)]
        goal: Option<String>,
        /// Insert at position N (0-based)
        #[arg(long, value_name = "N")]
        position: Option<usize>,
    },
    /// Delete a sprint; its cycles are discarded unless --reassign-to is given
    Delete {
        project: String,
        sprint_id: String,
        #[arg(long, value_name = "SPRINT_ID")]
        reassign_to: Option<String>,
    },
    /// Move a sprint within its phase or into another phase
    Move {
        project: String,
        sprint_id: String,
        /// Destination phase (defaults to the current one)
        #[arg(long = "to-phase", value_name = "PHASE_ID")]
        to_phase: Option<String>,
        /// Destination position N (0-based); appends if omitted
        #[arg(long, value_name = "N")]
        position: Option<usize>,
    },
    /// Reorder the sprints of one phase
    Order {
        project: String,
        phase_id: String,
        /// Sprint ids in desired order
        ids: Vec<String>,
    },
    /// Set a sprint's status (planning, active, completed, cancelled)
    Status {
        project: String,
        sprint_id: String,
        status: String,
    },
}

pub fn run(root: &Path, subcmd: SprintSubcommand, json: bool) -> anyhow::Result<()> {
    let ws = context::open(root)?;
    match subcmd {
        SprintSubcommand::Insert {
            project,
            phase_id,
            name,
            goal,
            position,
        } => {
            let spec = SprintSpec {
                sprint_name: name,
                goal,
            };
            let inserted = ws
                .engine
                .insert_sprint(&project, &phase_id, spec, position)
                .with_context(|| format!("failed to insert sprint into phase '{phase_id}'"))?;
            if json {
                return print_outcome(&inserted, &inserted.message, json);
            }
            println!("{}", inserted.message);
            println!("  id: {}", inserted.sprint.id);
            Ok(())
        }
        SprintSubcommand::Delete {
            project,
            sprint_id,
            reassign_to,
        } => {
            let deleted = ws
                .engine
                .delete_sprint(&project, &sprint_id, reassign_to.as_deref())
                .with_context(|| format!("failed to delete sprint '{sprint_id}'"))?;
            print_outcome(&deleted, &deleted.message, json)
        }
        SprintSubcommand::Move {
            project,
            sprint_id,
            to_phase,
            position,
        } => {
            let moves = [SprintMove {
                sprint_id: sprint_id.clone(),
                to_phase_id: to_phase,
                position,
            }];
            let moved = ws
                .engine
                .reorder_sprints(&project, &moves)
                .with_context(|| format!("failed to move sprint '{sprint_id}'"))?;
            print_outcome(&moved, &moved.message, json)
        }
        SprintSubcommand::Order {
            project,
            phase_id,
            ids,
        } => {
            let reordered = ws
                .engine
                .order_sprints(&project, &phase_id, &ids)
                .with_context(|| format!("failed to reorder sprints of phase '{phase_id}'"))?;
            print_outcome(&reordered, &reordered.message, json)
        }
        SprintSubcommand::Status {
            project,
            sprint_id,
            status,
        } => {
            let status: SprintStatus = status.parse()?;
            let updated = ws
                .engine
                .set_sprint_status(&project, &sprint_id, status)
                .with_context(|| format!("failed to update sprint '{sprint_id}'"))?;
            print_outcome(&updated, &updated.message, json)
        }
    }
}
