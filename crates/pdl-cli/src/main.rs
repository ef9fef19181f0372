mod cmd;
mod context;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    cycle::CycleSubcommand, milestone::MilestoneSubcommand, phase::PhaseSubcommand,
    project::ProjectSubcommand, sprint::SprintSubcommand, stage::StageSubcommand,
    storage::StorageSubcommand, task::TaskSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pdl",
    about = "Product development lifecycle roadmaps: phases, sprints, cycles and tasks",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .pdl/ or .git/)
    #[arg(long, global = true, env = "PDL_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, list and show projects
    Project {
        #[command(subcommand)]
        subcommand: ProjectSubcommand,
    },

    /// Manage a project's phases
    Phase {
        #[command(subcommand)]
        subcommand: PhaseSubcommand,
    },

    /// Manage sprints within phases
    Sprint {
        #[command(subcommand)]
        subcommand: SprintSubcommand,
    },

    /// Open PDL cycles in a sprint
    Cycle {
        #[command(subcommand)]
        subcommand: CycleSubcommand,
    },

    /// Update the stages of a cycle
    Stage {
        #[command(subcommand)]
        subcommand: StageSubcommand,
    },

    /// Manage tasks
    Task {
        #[command(subcommand)]
        subcommand: TaskSubcommand,
    },

    /// Manage roadmap milestones
    Milestone {
        #[command(subcommand)]
        subcommand: MilestoneSubcommand,
    },

    /// Inspect the storage backend or force a migration
    Storage {
        #[command(subcommand)]
        subcommand: StorageSubcommand,
    },

    /// Run the HTTP and WebSocket server
    Serve {
        /// Port to listen on (default: server.port from config; 0 = OS-assigned)
        #[arg(long)]
        port: Option<u16>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Project { subcommand } => cmd::project::run(&root, subcommand, cli.json),
        Commands::Phase { subcommand } => cmd::phase::run(&root, subcommand, cli.json),
        Commands::Sprint { subcommand } => cmd::sprint::run(&root, subcommand, cli.json),
        Commands::Cycle { subcommand } => cmd::cycle::run(&root, subcommand, cli.json),
        Commands::Stage { subcommand } => cmd::stage::run(&root, subcommand, cli.json),
        Commands::Task { subcommand } => cmd::task::run(&root, subcommand, cli.json),
        Commands::Milestone { subcommand } => cmd::milestone::run(&root, subcommand, cli.json),
        Commands::Storage { subcommand } => cmd::storage::run(&root, subcommand, cli.json),
        Commands::Serve { port } => cmd::serve::run(&root, port),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
