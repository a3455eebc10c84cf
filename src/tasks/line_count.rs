use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;

use super::{SourceSelection, TaskError};
use crate::config::SourceConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LineStats {
    pub files: usize,
    pub lines: usize,
}

/// Line counts keyed by file extension.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LineCounts {
    pub by_extension: BTreeMap<String, LineStats>,
}

impl LineCounts {
    pub fn total(&self) -> LineStats {
        self.by_extension.values().fold(LineStats::default(), |acc, s| LineStats {
            files: acc.files + s.files,
            lines: acc.lines + s.lines,
        })
    }
}

/// Count lines of the configured sources (like `wc -l`).
pub fn count_lines(root: &Path, source: &SourceConfig) -> Result<LineCounts, TaskError> {
    let selection = SourceSelection::new(&source.line_count_globs, &source.exclude_globs)?;
    let mut counts = LineCounts::default();
    for file in selection.collect(root)? {
        let data = fs::read(&file)?;
        let lines = data.iter().filter(|&&b| b == b'\n').count();
        let ext = file
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stats = counts.by_extension.entry(ext).or_default();
        stats.files += 1;
        stats.lines += lines;
    }
    Ok(counts)
}
