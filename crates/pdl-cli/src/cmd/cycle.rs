use crate::context;
use crate::output::print_outcome;
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum CycleSubcommand {
    /// Open a new seven-stage cycle in a sprint
    Add { project: String, sprint_id: String },
}

pub fn run(root: &Path, subcmd: CycleSubcommand, json: bool) -> anyhow::Result<()> {
    let ws = context::open(root)?;
    match subcmd {
        CycleSubcommand::Add { project, sprint_id } => {
            let inserted = ws
                .engine
                .insert_cycle(&project, &sprint_id)
                .with_context(|| format!("failed to open a cycle in sprint '{sprint_id}'"))?;
            if json {
                return print_outcome(&inserted, &inserted.message, json);
            }
            println!("{}", inserted.message);
            println!("  id: {}", inserted.cycle.id);
            Ok(())
        }
    }
}
