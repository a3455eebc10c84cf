//! Code signing.
//!
//! A missing signing tool (or missing credential variable) is not an
//! error: the run continues unsigned. Once the tool is present, every
//! signing failure is fatal.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::warn;

use super::{run_logged, ToolError};
use crate::config::{Environment, SignConfig};

/// Signs a file in place.
pub trait Signer {
    fn sign(&self, path: &Path) -> Result<(), ToolError>;
}

/// [`Signer`] backed by signtool.
#[derive(Debug, Clone)]
pub struct SignTool {
    program: PathBuf,
    args: Vec<String>,
}

impl SignTool {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Signer for SignTool {
    fn sign(&self, path: &Path) -> Result<(), ToolError> {
        if !path.exists() {
            return Err(ToolError::MissingOutput(path.to_path_buf()));
        }
        run_logged(Command::new(&self.program).args(&self.args).arg(path))
    }
}

/// Find the signing capability, or `None` when it is unavailable.
pub fn detect_signer(config: &SignConfig, env: &Environment, repo_root: &Path) -> Option<SignTool> {
    let program = repo_root.join(&config.tool);
    if !program.exists() {
        warn!("signing tool {} not found, binaries will not be signed", program.display());
        return None;
    }
    if let Some(var) = &config.credential_env {
        if !env.has(var) {
            warn!("{} is not set, binaries will not be signed", var);
            return None;
        }
    }
    Some(SignTool::new(program, config.args.clone()))
}
