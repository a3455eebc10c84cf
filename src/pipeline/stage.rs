//! Stage state machine
//!
//! Stages run strictly in declared order. A mode may skip stages, but a
//! run never moves backwards; `Failed` is reachable from any non-terminal
//! stage and `Done`/`Failed` are terminal.

use std::fmt;
use std::time::Duration;

use artifact_names::BuildVariant;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ReleaseError;

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Nothing has run yet
    Init,
    /// Version resolution and early credential checks
    Setup,
    Clean,
    Preflight,
    Compile(BuildVariant),
    Test,
    Sign,
    Package,
    /// Duplicate-publish check
    Manifest,
    Publish,
    Prune,
    Done,
    Failed,
}

impl Stage {
    fn rank(&self) -> usize {
        match self {
            Stage::Init => 0,
            Stage::Setup => 1,
            Stage::Clean => 2,
            Stage::Preflight => 3,
            Stage::Compile(v) => {
                4 + BuildVariant::ALL
                    .iter()
                    .position(|x| x == v)
                    .unwrap_or(0)
            }
            Stage::Test => 10,
            Stage::Sign => 11,
            Stage::Package => 12,
            Stage::Manifest => 13,
            Stage::Publish => 14,
            Stage::Prune => 15,
            Stage::Done => 16,
            Stage::Failed => 17,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }

    /// Check if transition from this stage to target is valid
    pub fn can_transition_to(&self, target: Stage) -> bool {
        if self.is_terminal() {
            return false;
        }
        match target {
            Stage::Failed => true,
            Stage::Init => false,
            _ => target.rank() > self.rank(),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Init => write!(f, "init"),
            Stage::Setup => write!(f, "setup"),
            Stage::Clean => write!(f, "clean"),
            Stage::Preflight => write!(f, "preflight"),
            Stage::Compile(v) => write!(f, "compile-{}", v),
            Stage::Test => write!(f, "test"),
            Stage::Sign => write!(f, "sign"),
            Stage::Package => write!(f, "package"),
            Stage::Manifest => write!(f, "manifest"),
            Stage::Publish => write!(f, "publish"),
            Stage::Prune => write!(f, "prune"),
            Stage::Done => write!(f, "done"),
            Stage::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Error)]
#[error("invalid stage transition from {from} to {to}")]
pub struct StageTransitionError {
    pub from: Stage,
    pub to: Stage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Succeeded,
    Skipped,
    Failed,
}

/// Outcome of one executed stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: String,
    pub status: StageStatus,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Tracks the current stage and the record of finished ones.
#[derive(Debug, Clone)]
pub struct StageTracker {
    current: Stage,
    pending_skip: Option<String>,
    records: Vec<StageRecord>,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StageTracker {
    pub fn new() -> Self {
        Self {
            current: Stage::Init,
            pending_skip: None,
            records: Vec::new(),
        }
    }

    pub fn current(&self) -> Stage {
        self.current
    }

    pub fn records(&self) -> &[StageRecord] {
        &self.records
    }

    pub fn enter(&mut self, stage: Stage) -> Result<(), StageTransitionError> {
        if !self.current.can_transition_to(stage) {
            return Err(StageTransitionError {
                from: self.current,
                to: stage,
            });
        }
        self.current = stage;
        self.pending_skip = None;
        Ok(())
    }

    /// Mark the current stage as skipped once it finishes.
    pub fn skip_current(&mut self, reason: impl Into<String>) {
        self.pending_skip = Some(reason.into());
    }

    pub fn succeed(&mut self, elapsed: Duration) {
        let (status, detail) = match self.pending_skip.take() {
            Some(reason) => (StageStatus::Skipped, Some(reason)),
            None => (StageStatus::Succeeded, None),
        };
        self.push(status, elapsed, detail);
    }

    /// Record the current stage as failed and move to `Failed`.
    pub fn fail(&mut self, elapsed: Duration, error: &ReleaseError) {
        self.push(StageStatus::Failed, elapsed, Some(error.to_string()));
        self.current = Stage::Failed;
    }

    pub fn complete(&mut self) -> Result<(), StageTransitionError> {
        self.enter(Stage::Done)
    }

    fn push(&mut self, status: StageStatus, elapsed: Duration, detail: Option<String>) {
        self.records.push(StageRecord {
            stage: self.current.to_string(),
            status,
            duration_ms: elapsed.as_millis() as u64,
            detail,
        });
    }
}

/// A stage failure: which stage, and why.
#[derive(Debug, Error)]
#[error("stage '{stage}' failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: ReleaseError,
}

impl PipelineError {
    pub fn new(stage: Stage, source: impl Into<ReleaseError>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        self.source.exit_code()
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
