use crate::context;
use crate::output::print_outcome;
use anyhow::Context;
use clap::Subcommand;
use pdl_core::cycle::StageUpdate;
use pdl_core::types::{PdlStage, StageStatus};
use std::path::Path;

#[derive(Subcommand)]
pub enum StageSubcommand {
    /// Update one stage of a cycle
    Update {
        project: String,
        cycle_id: String,
        /// discovery, definition, design, development, testing, launch or growth
        stage: String,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        completion: Option<u8>,
        /// Replace the stage's blockers (repeatable)
        #[arg(long = "blocker")]
        blockers: Vec<String>,
        /// Clear all blockers
        #[arg(long, conflicts_with = "blockers")]
        clear_blockers: bool,
    },
}

pub fn run(root: &Path, subcmd: StageSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        StageSubcommand::Update {
            project,
            cycle_id,
            stage,
            status,
            completion,
            blockers,
            clear_blockers,
        } => {
            let stage: PdlStage = stage.parse()?;
            let status = status.map(|s| s.parse::<StageStatus>()).transpose()?;
            let blockers = if clear_blockers {
                Some(Vec::new())
            } else if blockers.is_empty() {
                None
            } else {
                Some(blockers)
            };
            let update = StageUpdate {
                status,
                completion,
                blockers,
            };

            let ws = context::open(root)?;
            let updated = ws
                .engine
                .update_stage(&project, &cycle_id, stage, update)
                .with_context(|| format!("failed to update {stage} of cycle '{cycle_id}'"))?;
            print_outcome(&updated, &updated.message, json)
        }
    }
}
