use super::{check_key, BackendKind, Store};
use crate::error::{PdlError, Result};
use crate::paths;
use crate::project::Project;
use std::path::{Path, PathBuf};

/// Project documents kept as `<root>/.pdl/projects/<name>.yaml`.
pub struct PrivateStore {
    dir: PathBuf,
}

impl PrivateStore {
    pub fn new(root: &Path) -> Self {
        Self {
            dir: paths::projects_dir(root),
        }
    }

    /// True once at least one project document exists.
    pub fn has_projects(&self) -> bool {
        self.list_all().map(|names| !names.is_empty()).unwrap_or(false)
    }

    fn file(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.yaml"))
    }
}

impl Store for PrivateStore {
    fn fetch(&self, name: &str) -> Result<Option<Project>> {
        paths::validate_name(name)?;
        let path = self.file(name);
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&path)
            .map_err(|e| PdlError::Storage(format!("read {}: {e}", path.display())))?;
        let project = serde_yaml::from_str(&data)
            .map_err(|e| PdlError::Storage(format!("parse {}: {e}", path.display())))?;
        Ok(Some(project))
    }

    fn replace(&self, name: &str, project: &Project) -> Result<()> {
        paths::validate_name(name)?;
        check_key(name, project)?;
        let path = self.file(name);
        let data = serde_yaml::to_string(project)?;
        crate::io::atomic_write(&path, data.as_bytes())
            .map_err(|e| PdlError::Storage(format!("write {}: {e}", path.display())))
    }

    fn list_all(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Private
    }

    fn location(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::contract;
    use tempfile::TempDir;

    #[test]
    fn satisfies_store_contract() {
        let dir = TempDir::new().unwrap();
        let store = PrivateStore::new(dir.path());
        contract::fetch_missing_is_none(&store);
        contract::replace_then_fetch(&store);
        contract::rejects_mismatched_key(&store);
    }

    #[test]
    fn lists_sorted_yaml_stems_only() {
        let dir = TempDir::new().unwrap();
        let store = PrivateStore::new(dir.path());
        contract::list_all_sorted(&store);
        std::fs::write(store.location().join("notes.txt"), "ignored").unwrap();
        assert_eq!(store.list_all().unwrap().len(), 3);
    }

    #[test]
    fn has_projects_tracks_documents() {
        let dir = TempDir::new().unwrap();
        let store = PrivateStore::new(dir.path());
        assert!(!store.has_projects());
        std::fs::create_dir_all(store.location()).unwrap();
        assert!(!store.has_projects());
        store.replace("alpha", &Project::new("alpha")).unwrap();
        assert!(store.has_projects());
    }

    #[test]
    fn corrupt_document_is_storage_failure() {
        let dir = TempDir::new().unwrap();
        let store = PrivateStore::new(dir.path());
        std::fs::create_dir_all(store.location()).unwrap();
        std::fs::write(store.location().join("alpha.yaml"), ": : not yaml [").unwrap();
        assert!(matches!(store.fetch("alpha"), Err(PdlError::Storage(_))));
    }

    #[test]
    fn rejects_path_like_names() {
        let dir = TempDir::new().unwrap();
        let store = PrivateStore::new(dir.path());
        assert!(matches!(
            store.fetch("../escape"),
            Err(PdlError::InvalidName(_))
        ));
    }
}
