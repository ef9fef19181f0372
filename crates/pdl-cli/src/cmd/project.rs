use crate::context;
use crate::output::{date, print_json, print_outcome, print_table};
use anyhow::Context;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum ProjectSubcommand {
    /// Create an empty project
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Roadmap vision statement
        #[arg(long)]
        vision: Option<String>,
    },
    /// List all projects
    List,
    /// Show a project's roadmap
    Show { name: String },
}

pub fn run(root: &Path, subcmd: ProjectSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ProjectSubcommand::Create {
            name,
            description,
            vision,
        } => create(root, &name, description, vision, json),
        ProjectSubcommand::List => list(root, json),
        ProjectSubcommand::Show { name } => show(root, &name, json),
    }
}

fn create(
    root: &Path,
    name: &str,
    description: Option<String>,
    vision: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let ws = context::open(root)?;
    let created = ws
        .engine
        .create_project(name, description, vision)
        .with_context(|| format!("failed to create project '{name}'"))?;
    print_outcome(&created, &created.message, json)
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let ws = context::open(root)?;
    let names = ws.engine.list_projects().context("failed to list projects")?;

    if json {
        return print_json(&names);
    }
    if names.is_empty() {
        println!("No projects.");
        return Ok(());
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}

fn show(root: &Path, name: &str, json: bool) -> anyhow::Result<()> {
    let ws = context::open(root)?;
    let project = ws
        .engine
        .project(name)
        .with_context(|| format!("failed to load project '{name}'"))?;

    if json {
        return print_json(&project);
    }

    let roadmap = &project.roadmap;
    println!("Project:  {}", project.name);
    if let Some(vision) = &roadmap.vision {
        println!("Vision:   {vision}");
    }
    println!(
        "Timeline: {} .. {}",
        date(roadmap.start_date),
        date(roadmap.end_date)
    );
    println!("Progress: {}%", roadmap.overall_progress);
    println!();

    if roadmap.phases.is_empty() {
        println!("No phases.");
        return Ok(());
    }
    let mut rows = Vec::new();
    for phase in &roadmap.phases {
        rows.push(vec![
            phase.id.clone(),
            phase.phase_name.clone(),
            phase.status.to_string(),
            format!("{}%", phase.completion),
            date(phase.start_date),
            date(phase.end_date),
            phase.sprints.len().to_string(),
        ]);
        for sprint in &phase.sprints {
            rows.push(vec![
                format!("  {}", sprint.id),
                format!("  #{} {}", sprint.sprint_number, sprint.sprint_name),
                sprint.status.to_string(),
                String::new(),
                String::new(),
                String::new(),
                sprint.cycles.len().to_string(),
            ]);
        }
    }
    print_table(
        &["ID", "NAME", "STATUS", "DONE", "START", "END", "CHILDREN"],
        rows,
    );
    Ok(())
}
