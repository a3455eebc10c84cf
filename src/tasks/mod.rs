//! Source-tree maintenance commands (`format`, `wc`).

mod format;
mod line_count;

pub use format::format_sources;
pub use line_count::{count_lines, LineCounts, LineStats};

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::tools::ToolError;

/// Errors for source-tree commands
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Glob pattern error: {0}")]
    GlobError(#[from] globset::Error),

    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Tool(#[from] ToolError),
}

fn build_set(patterns: &[String]) -> Result<GlobSet, TaskError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns.iter().filter(|p| !p.is_empty()) {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Include/exclude glob pair over repo-relative paths.
#[derive(Debug)]
pub struct SourceSelection {
    include: GlobSet,
    exclude: GlobSet,
}

impl SourceSelection {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, TaskError> {
        Ok(Self {
            include: build_set(include)?,
            exclude: build_set(exclude)?,
        })
    }

    /// Check if a repo-relative path is selected
    pub fn is_selected(&self, rel: &Path) -> bool {
        let s = rel.to_string_lossy().replace('\\', "/");
        self.include.is_match(&s) && !self.exclude.is_match(&s)
    }

    /// Selected files under `root`, sorted.
    pub fn collect(&self, root: &Path) -> Result<Vec<PathBuf>, TaskError> {
        let mut files = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(root) else {
                continue;
            };
            if self.is_selected(rel) {
                files.push(entry.path().to_path_buf());
            }
        }
        Ok(files)
    }
}
