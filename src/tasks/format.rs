use std::path::Path;
use std::process::Command;

use tracing::info;

use super::{SourceSelection, TaskError};
use crate::config::{SourceConfig, ToolsConfig};
use crate::tools::run_logged;

/// Run clang-format in place over the configured sources.
pub fn format_sources(
    root: &Path,
    source: &SourceConfig,
    tools: &ToolsConfig,
) -> Result<usize, TaskError> {
    let selection = SourceSelection::new(&source.format_globs, &source.exclude_globs)?;
    let files = selection.collect(root)?;
    for file in &files {
        run_logged(
            Command::new(&tools.clang_format)
                .args(["-i", "--style=file"])
                .arg(file)
                .current_dir(root),
        )?;
    }
    info!("formatted {} files", files.len());
    Ok(files.len())
}
