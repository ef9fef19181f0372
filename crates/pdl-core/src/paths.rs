use crate::error::{PdlError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const PDL_DIR: &str = ".pdl";
pub const PROJECTS_DIR: &str = ".pdl/projects";
pub const CONFIG_FILE: &str = ".pdl/config.yaml";
pub const MIGRATION_MARKER: &str = ".pdl/migrated.yaml";

pub const USER_PDL_DIR: &str = ".pdl";
pub const SHARED_STORE_FILE: &str = "shared.redb";
pub const INSTANCES_DIR: &str = "instances";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn pdl_dir(root: &Path) -> PathBuf {
    root.join(PDL_DIR)
}

pub fn projects_dir(root: &Path) -> PathBuf {
    root.join(PROJECTS_DIR)
}

pub fn project_file(root: &Path, name: &str) -> PathBuf {
    projects_dir(root).join(format!("{name}.yaml"))
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn migration_marker_path(root: &Path) -> PathBuf {
    root.join(MIGRATION_MARKER)
}

/// `~/.pdl`, home of the shared store and the instance registry.
pub fn user_pdl_dir() -> Result<PathBuf> {
    let home = home::home_dir().ok_or(PdlError::HomeNotFound)?;
    Ok(home.join(USER_PDL_DIR))
}

pub fn default_shared_store_path() -> Result<PathBuf> {
    Ok(user_pdl_dir()?.join(SHARED_STORE_FILE))
}

/// Instances register next to the shared store they would contend for.
pub fn instances_dir_for(shared_path: &Path) -> PathBuf {
    shared_path
        .parent()
        .unwrap_or(Path::new("."))
        .join(INSTANCES_DIR)
}

// ---------------------------------------------------------------------------
// Name validation
// ---------------------------------------------------------------------------

static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn name_re() -> &'static Regex {
    NAME_RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9][a-z0-9_\-]*[a-z0-9]$|^[a-z0-9]$").expect("static regex")
    })
}

/// Project names double as store keys and file stems.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > 64 || !name_re().is_match(name) {
        return Err(PdlError::InvalidName(name.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        for name in ["alpha", "a", "my_project-2", "x1"] {
            validate_name(name).unwrap_or_else(|_| panic!("expected valid: {name}"));
        }
    }

    #[test]
    fn invalid_names() {
        for name in ["", "-alpha", "alpha-", "has spaces", "UPPER", "../etc"] {
            assert!(validate_name(name).is_err(), "expected invalid: {name}");
        }
    }

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            project_file(root, "alpha"),
            PathBuf::from("/tmp/proj/.pdl/projects/alpha.yaml")
        );
        assert_eq!(
            migration_marker_path(root),
            PathBuf::from("/tmp/proj/.pdl/migrated.yaml")
        );
        assert_eq!(
            instances_dir_for(Path::new("/home/u/.pdl/shared.redb")),
            PathBuf::from("/home/u/.pdl/instances")
        );
    }
}
