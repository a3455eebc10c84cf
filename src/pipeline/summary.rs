//! Run summary (`artifacts/release_summary.json`)

use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::context::{Mode, PipelineContext};
use super::publish::{PublishedObject, UploadDecision};
use super::stage::{PipelineError, StageRecord};
use crate::version::VersionInfo;

pub const SUMMARY_SCHEMA_VERSION: u32 = 1;

pub const SUMMARY_SCHEMA_ID: &str = "sumatra-release/release_summary@1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseSummary {
    pub schema_version: u32,
    pub schema_id: String,
    pub run_id: String,
    pub mode: Mode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub versions: Option<VersionInfo>,
    pub upload: UploadDecision,
    pub stages: Vec<StageRecord>,
    pub published: Vec<PublishedObject>,
    pub pruned: Vec<String>,
    pub prune_failures: usize,
    pub outcome: Outcome,
    pub exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReleaseSummary {
    pub fn new(
        ctx: &PipelineContext,
        stages: &[StageRecord],
        published: Vec<PublishedObject>,
        pruned: Vec<String>,
        prune_failures: usize,
        error: Option<&PipelineError>,
    ) -> Self {
        Self {
            schema_version: SUMMARY_SCHEMA_VERSION,
            schema_id: SUMMARY_SCHEMA_ID.to_string(),
            run_id: ctx.run_id.clone(),
            mode: ctx.mode,
            started_at: ctx.started_at,
            finished_at: Utc::now(),
            versions: ctx.versions().cloned(),
            upload: ctx.upload.clone(),
            stages: stages.to_vec(),
            published,
            pruned,
            prune_failures,
            outcome: if error.is_some() {
                Outcome::Failed
            } else {
                Outcome::Succeeded
            },
            exit_code: error.map(PipelineError::exit_code).unwrap_or(0),
            error: error.map(|e| e.to_string()),
        }
    }

    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at).num_milliseconds().max(0) as u64
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = self.to_json().map_err(io::Error::other)?;
        fs::write(path, json)
    }
}
