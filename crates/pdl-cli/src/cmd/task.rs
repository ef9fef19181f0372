use crate::context;
use crate::output::print_outcome;
use anyhow::{bail, Context};
use clap::Subcommand;
use pdl_core::task::TaskSpec;
use pdl_core::types::TaskStatus;
use std::path::Path;

#[derive(Subcommand)]
pub enum TaskSubcommand {
    /// Add a task to a cycle, or to the latest cycle of a sprint
    Add {
        project: String,
        description: String,
        #[arg(
            long,
            value_name = "CYCLE_ID",
            conflicts_with = "sprint",
            required_unless_present = "sprint"
        )]
        cycle: Option<String>,
        #[arg(long, value_name = "SPRINT_ID")]
        sprint: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long, default_value = "0")]
        points: u32,
    },
    /// Set a task's status (todo, in_progress, done, blocked)
    Status {
        project: String,
        task_id: String,
        status: String,
    },
}

pub fn run(root: &Path, subcmd: TaskSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        TaskSubcommand::Add {
            project,
            description,
            cycle,
            sprint,
            assignee,
            points,
        } => {
            if description.trim().is_empty() {
                bail!("task description must not be empty");
            }
            let spec = TaskSpec {
                description,
                assignee,
                story_points: points,
            };
            let ws = context::open(root)?;
            let inserted = match (cycle, sprint) {
                (Some(cycle_id), _) => ws
                    .engine
                    .insert_task(&project, &cycle_id, spec)
                    .with_context(|| format!("failed to add task to cycle '{cycle_id}'"))?,
                (None, Some(sprint_id)) => ws
                    .engine
                    .insert_sprint_task(&project, &sprint_id, spec)
                    .with_context(|| format!("failed to add task to sprint '{sprint_id}'"))?,
                (None, None) => bail!("either --cycle or --sprint is required"),
            };
            if json {
                return print_outcome(&inserted, &inserted.message, json);
            }
            println!("{}", inserted.message);
            println!("  id: {}", inserted.task.id);
            Ok(())
        }
        TaskSubcommand::Status {
            project,
            task_id,
            status,
        } => {
            let status: TaskStatus = status.parse()?;
            let ws = context::open(root)?;
            let updated = ws
                .engine
                .set_task_status(&project, &task_id, status)
                .with_context(|| format!("failed to update task '{task_id}'"))?;
            print_outcome(&updated, &updated.message, json)
        }
    }
}
