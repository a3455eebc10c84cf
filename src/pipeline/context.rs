//! Run-scoped state shared by every stage.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use super::publish::{decide_upload, UploadDecision};
use crate::config::{Environment, ReleaseConfig};
use crate::layout::BuildLayout;
use crate::version::VersionInfo;

/// Pipeline entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Quick local x64 build, nothing published
    Smoke,
    /// Full build, published when uploads are enabled
    PreRelease,
    /// Full build on CI, never published
    CiBuild,
    /// Publish the output of an earlier CI build
    CiUpload,
    /// Prune old versions only
    DeleteOldBuilds,
    /// Build and sign MakeLZSA.exe
    BuildLzsa,
}

impl Mode {
    /// Whether remote stores must be configured for this run.
    pub fn needs_stores(&self, upload: &UploadDecision) -> bool {
        match self {
            Mode::DeleteOldBuilds => true,
            Mode::PreRelease | Mode::CiUpload => upload.is_enabled(),
            _ => false,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::Smoke => "smoke",
            Mode::PreRelease => "pre-release",
            Mode::CiBuild => "ci",
            Mode::CiUpload => "ci-upload",
            Mode::DeleteOldBuilds => "delete-old-builds",
            Mode::BuildLzsa => "build-lzsa",
        };
        f.write_str(s)
    }
}

/// Flags chosen on the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub upload: bool,
    /// Allow building with uncommitted changes
    pub no_clean_check: bool,
    /// Log prune deletes instead of performing them
    pub dry_run_prune: bool,
}

/// Everything a run needs that is not a collaborator.
///
/// Built once per run and passed to every stage; there is no global
/// state.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub run_id: String,
    pub mode: Mode,
    pub config: ReleaseConfig,
    pub layout: BuildLayout,
    pub env: Environment,
    pub upload: UploadDecision,
    pub options: RunOptions,
    pub started_at: DateTime<Utc>,
    versions: Option<VersionInfo>,
}

impl PipelineContext {
    pub fn new(
        root: &Path,
        config: ReleaseConfig,
        mode: Mode,
        env: Environment,
        options: RunOptions,
    ) -> Self {
        let upload = decide_upload(mode, options.upload, &env.ci_context(), &config.publish);
        Self {
            run_id: Ulid::new().to_string(),
            mode,
            layout: BuildLayout::new(root, &config.paths),
            config,
            env,
            upload,
            options,
            started_at: Utc::now(),
            versions: None,
        }
    }

    pub fn versions(&self) -> Option<&VersionInfo> {
        self.versions.as_ref()
    }

    /// Record the run's versions. The first value sticks.
    pub(crate) fn set_versions(&mut self, info: &VersionInfo) {
        if self.versions.is_none() {
            self.versions = Some(info.clone());
        }
    }
}
