use crate::context;
use crate::output::{date, print_json, print_outcome, print_table};
use anyhow::{anyhow, Context};
use chrono::{DateTime, NaiveDate, Utc};
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum MilestoneSubcommand {
    /// Add a milestone to a project's roadmap
    Add {
        project: String,
        name: String,
        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        target: Option<String>,
        /// Phase the milestone belongs to
        #[arg(long, value_name = "PHASE_ID")]
        phase: Option<String>,
    },
    /// List a project's milestones
    List { project: String },
}

pub fn run(root: &Path, subcmd: MilestoneSubcommand, json: bool) -> anyhow::Result<()> {
    let ws = context::open(root)?;
    match subcmd {
        MilestoneSubcommand::Add {
            project,
            name,
            target,
            phase,
        } => {
            let target = target.as_deref().map(parse_date).transpose()?;
            let added = ws
                .engine
                .add_milestone(&project, &name, target, phase.as_deref())
                .with_context(|| format!("failed to add milestone to '{project}'"))?;
            print_outcome(&added, &added.message, json)
        }
        MilestoneSubcommand::List { project } => {
            let project = ws
                .engine
                .project(&project)
                .with_context(|| format!("failed to load project '{project}'"))?;
            let milestones = &project.roadmap.milestones;
            if json {
                return print_json(milestones);
            }
            if milestones.is_empty() {
                println!("No milestones.");
                return Ok(());
            }
            let rows = milestones
                .iter()
                .map(|m| {
                    vec![
                        m.id.clone(),
                        m.name.clone(),
                        date(m.target_date),
                        m.phase_id.clone().unwrap_or_else(|| "-".to_string()),
                        if m.achieved { "yes" } else { "no" }.to_string(),
                    ]
                })
                .collect();
            print_table(&["ID", "NAME", "TARGET", "PHASE", "ACHIEVED"], rows);
            Ok(())
        }
    }
}

fn parse_date(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let day = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| anyhow!("invalid date '{s}': {e}"))?;
    day.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| anyhow!("invalid date '{s}'"))
}
