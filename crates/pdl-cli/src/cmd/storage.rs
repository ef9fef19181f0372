use crate::context;
use crate::output::{print_json, print_outcome};
use anyhow::Context;
use clap::Subcommand;
use pdl_core::config::Config;
use pdl_core::instances;
use pdl_core::migration;
use pdl_core::paths;
use pdl_core::store::{PrivateStore, SharedStore};
use serde::Serialize;
use std::path::Path;

#[derive(Subcommand)]
pub enum StorageSubcommand {
    /// Show which backend this process bound and why
    Status,
    /// Copy the private store into the shared store now, ignoring the marker
    Migrate,
}

#[derive(Serialize)]
struct StorageStatus<'a> {
    #[serde(flatten)]
    selection: &'a pdl_core::selector::SelectionInfo,
    live_instances: usize,
}

pub fn run(root: &Path, subcmd: StorageSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        StorageSubcommand::Status => status(root, json),
        StorageSubcommand::Migrate => migrate(root, json),
    }
}

fn status(root: &Path, json: bool) -> anyhow::Result<()> {
    let ws = context::open(root)?;
    let info = &ws.selection.info;
    let registry = paths::instances_dir_for(&info.shared_path);
    let live_instances = instances::count_live_others(&registry, std::process::id())
        .context("failed to read the instance registry")?;

    if json {
        return print_json(&StorageStatus {
            selection: info,
            live_instances,
        });
    }

    println!("Backend:   {}", info.backend);
    if info.decided != info.backend {
        println!("Decided:   {}", info.decided);
    }
    println!("Reason:    {}", info.reason_text);
    println!("Private:   {}", info.private_path.display());
    println!("Shared:    {}", info.shared_path.display());
    println!("Instances: {live_instances}");
    if let Some(report) = &info.migration {
        println!(
            "Migrated:  {} project(s) at {}",
            report.count,
            report.migrated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    if let Some(cause) = &info.fallback {
        println!("Fallback:  {cause}");
    }
    Ok(())
}

fn migrate(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load .pdl/config.yaml")?;
    let shared_path = config
        .shared_store_path(root)
        .context("failed to locate the shared store")?;
    let shared = SharedStore::open(&shared_path)
        .with_context(|| format!("failed to open {}", shared_path.display()))?;
    let private = PrivateStore::new(root);

    let report = migration::migrate(root, &private, &shared).context("migration failed")?;
    let message = format!(
        "Migrated {} project(s) to {} ({} already current)",
        report.count,
        shared_path.display(),
        report.skipped.len()
    );
    print_outcome(&report, &message, json)
}
