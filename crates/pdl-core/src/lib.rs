pub mod config;
pub mod cycle;
pub mod engine;
pub mod error;
pub mod instances;
pub mod io;
pub mod legacy;
pub mod migration;
pub mod paths;
pub mod phase;
pub mod project;
pub mod selector;
pub mod sprint;
pub mod store;
pub mod task;
pub mod types;

pub use engine::Engine;
pub use error::{PdlError, Result};
pub use store::{BackendKind, Store};

/// Fresh globally unique identifier, e.g. `phase_1f0c...`. Never reassigned.
pub fn new_id(prefix: &str) -> String {
    format!("{prefix}_{}", uuid::Uuid::new_v4().simple())
}
