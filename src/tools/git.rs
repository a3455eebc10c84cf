//! Source control access through the git CLI.

use std::path::{Path, PathBuf};
use std::process::Command;

use super::{capture, capture_raw, run_logged, ToolError};

/// Source-control queries a release run depends on.
pub trait SourceControl {
    /// Number of commits reachable from HEAD.
    fn revision_count(&self) -> Result<u64, ToolError>;

    /// Full revision id of HEAD.
    fn head_revision(&self) -> Result<String, ToolError>;

    /// Paths with uncommitted changes (empty when clean).
    fn uncommitted_changes(&self) -> Result<Vec<String>, ToolError>;

    /// Name of the checked-out branch.
    fn current_branch(&self) -> Result<String, ToolError>;

    /// Restore a tracked file to its committed contents.
    fn restore_file(&self, path: &Path) -> Result<(), ToolError>;
}

/// [`SourceControl`] backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
    repo_root: PathBuf,
}

impl GitCli {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            program: PathBuf::from("git"),
            repo_root: repo_root.into(),
        }
    }

    fn git(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.current_dir(&self.repo_root);
        cmd
    }
}

impl SourceControl for GitCli {
    fn revision_count(&self) -> Result<u64, ToolError> {
        let out = capture(self.git().args(["rev-list", "--count", "HEAD"]))?;
        out.parse().map_err(|_| ToolError::BadOutput {
            program: "git rev-list".to_string(),
            message: format!("'{}' is not a commit count", out),
        })
    }

    fn head_revision(&self) -> Result<String, ToolError> {
        capture(self.git().args(["rev-parse", "HEAD"]))
    }

    fn uncommitted_changes(&self) -> Result<Vec<String>, ToolError> {
        let out = capture_raw(self.git().args(["status", "--porcelain", "-z"]))?;
        Ok(parse_porcelain(&out))
    }

    fn current_branch(&self) -> Result<String, ToolError> {
        capture(self.git().args(["rev-parse", "--abbrev-ref", "HEAD"]))
    }

    fn restore_file(&self, path: &Path) -> Result<(), ToolError> {
        run_logged(self.git().arg("checkout").arg("--").arg(path))
    }
}

/// Paths from `git status --porcelain -z` output.
///
/// Each record is `XY <path>` terminated by NUL. Renames and copies are
/// followed by one extra record holding the source path.
fn parse_porcelain(out: &str) -> Vec<String> {
    let mut paths = Vec::new();
    let mut records = out.split('\0').filter(|r| !r.is_empty());
    while let Some(record) = records.next() {
        let (Some(status), Some(path)) = (record.get(..2), record.get(3..)) else {
            continue;
        };
        paths.push(path.to_string());
        if status.contains('R') || status.contains('C') {
            records.next();
        }
    }
    paths
}
