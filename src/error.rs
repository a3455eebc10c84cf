//! Error taxonomy for release runs.
//!
//! Every module has its own error enum; [`ReleaseError`] aggregates them
//! and maps each onto one of four categories that decide the exit code.

use std::io;

use artifact_names::NameError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::manifest::ManifestError;
use crate::pipeline::StageTransitionError;
use crate::store::StoreError;
use crate::tools::ToolError;
use crate::version::VersionError;

/// Coarse error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed version, bad config, missing credentials
    Config,
    /// External process failure or missing build output
    Tool,
    /// Remote store operation failure
    Store,
    /// A release invariant does not hold
    Policy,
}

impl ErrorCategory {
    /// Process exit code for this category.
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorCategory::Config => 1,
            ErrorCategory::Tool => 2,
            ErrorCategory::Store => 3,
            ErrorCategory::Policy => 4,
        }
    }
}

/// Broken release invariants found by preflight checks.
#[derive(Debug, Error)]
pub enum PolicyViolation {
    #[error("working tree has uncommitted changes: {}", .0.join(", "))]
    DirtyTree(Vec<String>),

    #[error("on branch '{actual}', releases are built from '{expected}'")]
    WrongBranch { expected: String, actual: String },

    #[error("translation strings are out of date: {0}")]
    StaleTranslations(String),
}

/// Any error a release run can hit.
#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("version error: {0}")]
    Version(#[from] VersionError),

    #[error("artifact naming error: {0}")]
    Names(#[from] NameError),

    #[error("tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("policy violation: {0}")]
    Policy(#[from] PolicyViolation),

    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("stage error: {0}")]
    Stage(#[from] StageTransitionError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReleaseError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ReleaseError::Config(_) | ReleaseError::Version(_) | ReleaseError::Names(_) => {
                ErrorCategory::Config
            }
            ReleaseError::Store(_) => ErrorCategory::Store,
            ReleaseError::Policy(_) => ErrorCategory::Policy,
            ReleaseError::Tool(_)
            | ReleaseError::Manifest(_)
            | ReleaseError::Stage(_)
            | ReleaseError::Io(_)
            | ReleaseError::Serialization(_) => ErrorCategory::Tool,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.category().exit_code()
    }
}

/// Result type for release operations
pub type ReleaseResult<T> = Result<T, ReleaseError>;
