//! Cheap local checks that gate the expensive build.

use tracing::info;

use crate::error::{PolicyViolation, ReleaseResult};
use crate::tools::{SourceControl, StringsCheck, ToolError};

/// Which preflight checks run.
#[derive(Debug, Clone, Default)]
pub struct PreflightChecks {
    pub require_clean_tree: bool,
    /// Branch releases must be built from
    pub required_branch: Option<String>,
}

pub fn run_preflight(
    checks: &PreflightChecks,
    scm: &dyn SourceControl,
    strings: &dyn StringsCheck,
) -> ReleaseResult<()> {
    if checks.require_clean_tree {
        let changes = scm.uncommitted_changes()?;
        if !changes.is_empty() {
            return Err(PolicyViolation::DirtyTree(changes).into());
        }
    } else {
        info!("skipping clean tree check");
    }

    if let Some(expected) = &checks.required_branch {
        let actual = scm.current_branch()?;
        if &actual != expected {
            return Err(PolicyViolation::WrongBranch {
                expected: expected.clone(),
                actual,
            }
            .into());
        }
    }

    match strings.verify() {
        Ok(()) => {}
        Err(e @ ToolError::ExitStatus { .. }) => {
            return Err(PolicyViolation::StaleTranslations(e.to_string()).into());
        }
        Err(e) => return Err(e.into()),
    }

    // regeneration rewrote committed sources
    if checks.require_clean_tree {
        let changes = scm.uncommitted_changes()?;
        if !changes.is_empty() {
            return Err(PolicyViolation::StaleTranslations(format!(
                "regenerated files differ: {}",
                changes.join(", ")
            ))
            .into());
        }
    }
    Ok(())
}
