//! Translation strings freshness check.

use std::path::PathBuf;
use std::process::Command;

use super::{run_logged, ToolError};

/// Fails when translation strings need regenerating.
pub trait StringsCheck {
    fn verify(&self) -> Result<(), ToolError>;
}

/// Runs the configured regeneration command. A non-zero exit means stale
/// strings; so do files it changed, which preflight checks afterwards.
#[derive(Debug, Clone)]
pub struct CommandStringsCheck {
    argv: Vec<String>,
    repo_root: PathBuf,
}

impl CommandStringsCheck {
    pub fn new(argv: Vec<String>, repo_root: impl Into<PathBuf>) -> Self {
        Self {
            argv,
            repo_root: repo_root.into(),
        }
    }
}

impl StringsCheck for CommandStringsCheck {
    fn verify(&self) -> Result<(), ToolError> {
        let Some((program, args)) = self.argv.split_first() else {
            return Err(ToolError::NotConfigured("translation check"));
        };
        run_logged(Command::new(program).args(args).current_dir(&self.repo_root))
    }
}
