use anyhow::Context;
use pdl_core::config::{Config, WarnLevel};
use pdl_core::selector::{self, Selection, SelectorContext};
use pdl_core::Engine;
use std::path::Path;

/// Config, bound store and engine for one invocation.
pub struct Workspace {
    pub config: Config,
    pub selection: &'static Selection,
    pub engine: Engine,
}

pub fn open(root: &Path) -> anyhow::Result<Workspace> {
    let config = Config::load(root).context("failed to load .pdl/config.yaml")?;
    for w in config.validate() {
        match w.level {
            WarnLevel::Error => tracing::error!("config: {}", w.message),
            WarnLevel::Warning => tracing::warn!("config: {}", w.message),
        }
    }
    let ctx = SelectorContext::from_config(root, &config)
        .context("failed to locate the shared store")?;
    let selection = selector::select_once(&ctx);
    let engine = Engine::new(selection.store.clone())
        .with_default_phase_weeks(config.defaults.phase_duration_weeks);
    Ok(Workspace {
        config,
        selection,
        engine,
    })
}
