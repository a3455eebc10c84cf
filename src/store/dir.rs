//! Store backed by a local directory, for dry runs and mirrors.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{Listing, ObjectStore, StoreError, StoreObject};

/// Keys map to paths below `root`.
#[derive(Debug, Clone)]
pub struct DirStore {
    name: String,
    root: PathBuf,
}

impl DirStore {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl ObjectStore for DirStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn list(&self, prefix: &str, max_results: usize) -> Result<Listing, StoreError> {
        if !self.root.exists() {
            return Ok(Listing::default());
        }
        let mut objects = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|e| StoreError::Protocol(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let key = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if key.starts_with(prefix) {
                objects.push(StoreObject {
                    key,
                    size: entry.metadata().map(|m| m.len()).unwrap_or(0),
                });
            }
        }
        let truncated = objects.len() > max_results;
        objects.truncate(max_results);
        Ok(Listing { objects, truncated })
    }

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.path_for(key).is_file())
    }

    fn upload(&self, key: &str, source: &Path) -> Result<(), StoreError> {
        let dest = self.path_for(key);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source, dest)?;
        Ok(())
    }

    fn upload_string(&self, key: &str, content: &str) -> Result<(), StoreError> {
        let dest = self.path_for(key);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(dest, content)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        fs::remove_file(self.path_for(key))?;
        Ok(())
    }
}
