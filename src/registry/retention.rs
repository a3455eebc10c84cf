//! Retention of remote version groups
//!
//! - Count-based: the newest `retain` groups are kept
//! - Manifest objects are never deleted, even in pruned groups
//! - A protected version (the one just published) is never pruned
//! - Deletes are best-effort; failures are reported and skipped

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::VersionGroup;
use crate::store::ObjectStore;

/// Retention policy for published versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Number of newest version groups to keep
    pub retain: usize,
    /// Version that must survive regardless of rank
    #[serde(default)]
    pub protect: Option<u64>,
    /// Log but don't delete
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::keep_last_n(10)
    }
}

impl RetentionPolicy {
    pub fn keep_last_n(retain: usize) -> Self {
        Self {
            retain,
            protect: None,
            dry_run: false,
        }
    }

    pub fn protecting(mut self, version: u64) -> Self {
        self.protect = Some(version);
        self
    }

    pub fn with_dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Delete operations for `groups`, which must be sorted newest first.
    pub fn plan(&self, groups: &[VersionGroup]) -> Vec<DeleteOp> {
        let retain = self.retain.max(1);
        let mut ops = Vec::new();
        for group in groups.iter().skip(retain) {
            if self.protect == Some(group.version) {
                warn!(version = group.version, "protected version ranked beyond retention, keeping");
                continue;
            }
            ops.extend(
                group
                    .entries
                    .iter()
                    .filter(|e| !e.is_manifest())
                    .map(|e| DeleteOp {
                        version: group.version,
                        key: e.path.clone(),
                    }),
            );
        }
        ops
    }
}

/// One object to delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteOp {
    pub version: u64,
    pub key: String,
}

/// Outcome of applying a prune plan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PruneReport {
    pub deleted: Vec<String>,
    /// (key, error) for deletes that failed
    pub failed: Vec<(String, String)>,
    pub dry_run: bool,
}

/// Apply delete operations, continuing past individual failures.
pub fn apply_prune(store: &dyn ObjectStore, ops: &[DeleteOp], dry_run: bool) -> PruneReport {
    let mut report = PruneReport {
        dry_run,
        ..PruneReport::default()
    };
    for op in ops {
        if dry_run {
            info!(store = store.name(), "DRY-RUN: would delete {}", op.key);
            report.deleted.push(op.key.clone());
            continue;
        }
        match store.delete(&op.key) {
            Ok(()) => {
                info!(store = store.name(), "deleted {}", op.key);
                report.deleted.push(op.key.clone());
            }
            Err(e) => {
                warn!(store = store.name(), "failed to delete {}: {}", op.key, e);
                report.failed.push((op.key.clone(), e.to_string()));
            }
        }
    }
    report
}
