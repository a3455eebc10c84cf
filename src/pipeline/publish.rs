//! Publishing to remote stores.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use artifact_names::{encode, ArtifactKind, BuildVariant};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use super::context::Mode;
use crate::config::{CiContext, PublishConfig};
use crate::layout::BuildLayout;
use crate::registry::ArtifactRegistry;
use crate::version::VersionInfo;

/// Whether this run publishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum UploadDecision {
    Enabled,
    /// Not requested, or not allowed here
    Skipped(String),
}

impl UploadDecision {
    pub fn is_enabled(&self) -> bool {
        matches!(self, UploadDecision::Enabled)
    }
}

/// Decide whether a run may publish.
///
/// CI uploads additionally require a push to the release branch of the
/// canonical repository.
pub fn decide_upload(
    mode: Mode,
    requested: bool,
    ci: &CiContext,
    publish: &PublishConfig,
) -> UploadDecision {
    if !matches!(mode, Mode::PreRelease | Mode::CiUpload) {
        return UploadDecision::Skipped(format!("{} builds are not published", mode));
    }
    if !requested {
        return UploadDecision::Skipped("--upload not given".to_string());
    }
    if mode == Mode::CiUpload {
        if !ci.is_on_branch(&publish.release_branch) {
            return UploadDecision::Skipped(format!(
                "not on {} branch (GITHUB_REF: '{}')",
                publish.release_branch,
                ci.git_ref.as_deref().unwrap_or_default()
            ));
        }
        if !ci.is_canonical_push(&publish.canonical_repository) {
            return UploadDecision::Skipped(format!(
                "not a push to {}",
                publish.canonical_repository
            ));
        }
    }
    UploadDecision::Enabled
}

/// One local file and the key it is published under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadItem {
    pub local: PathBuf,
    pub key: String,
}

/// Files to upload for `version`, manifest last.
///
/// The manifest marks a version as published, so it only goes up once
/// every other file is in place.
pub fn upload_plan(
    layout: &BuildLayout,
    registry: &ArtifactRegistry,
    variants: &[BuildVariant],
    version: u64,
) -> Vec<UploadItem> {
    let mut plan = Vec::new();
    for &variant in variants {
        let dir = layout.variant_dir(variant);
        for kind in ArtifactKind::uploaded_per_variant() {
            plan.push(UploadItem {
                local: dir.join(kind.local_file_name()),
                key: registry.key_for(&encode(kind, version, variant)),
            });
        }
    }
    plan.push(UploadItem {
        local: layout.manifest_path(),
        key: registry.manifest_key(version),
    });
    plan
}

/// A file that reached a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedObject {
    pub store: String,
    pub key: String,
    pub size: u64,
    pub sha256: String,
}

/// Size and hex SHA-256 of a file.
pub fn file_digest(path: &Path) -> io::Result<(u64, String)> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let size = io::copy(&mut file, &mut hasher)?;
    Ok((size, hex::encode(hasher.finalize())))
}

/// Daily-build info files: (key, contents).
pub fn daily_info_files(
    publish: &PublishConfig,
    versions: &VersionInfo,
    built_on: NaiveDate,
) -> Vec<(String, String)> {
    let ver = versions.pre_release;
    vec![
        (
            format!("{}sumadaily.js", publish.info_prefix),
            daily_js(publish, ver, built_on),
        ),
        (
            format!("{}sumpdf-daily-latest.txt", publish.info_prefix),
            ver.to_string(),
        ),
        (
            format!("{}sumpdf-daily-update.txt", publish.info_prefix),
            format!("[SumatraPDF]\nLatest {}\n", ver),
        ),
    ]
}

fn daily_js(publish: &PublishConfig, ver: u64, built_on: NaiveDate) -> String {
    let url = |kind: ArtifactKind, variant: BuildVariant| {
        format!(
            "{}{}{}",
            publish.public_base_url,
            publish.remote_prefix,
            encode(kind, ver, variant)
        )
    };
    let mut js = format!(
        "var sumLatestVer = {};\nvar sumBuiltOn = \"{}\";\nvar sumLatestName = \"{}\";\n",
        ver,
        built_on.format("%Y-%m-%d"),
        encode(ArtifactKind::MainExe, ver, BuildVariant::Win32)
    );
    for variant in BuildVariant::ALL {
        let suffix = match variant {
            BuildVariant::Win32 => "",
            BuildVariant::X64 => "64",
        };
        js.push_str(&format!(
            "\nvar sumLatestExe{s} = \"{}\";\nvar sumLatestPdb{s} = \"{}\";\nvar sumLatestInstaller{s} = \"{}\";\n",
            url(ArtifactKind::MainExe, variant),
            url(ArtifactKind::DebugSymbolArchiveZip, variant),
            url(ArtifactKind::DllExe, variant),
            s = suffix
        ));
    }
    js
}

/// Log a finished upload.
pub(crate) fn log_uploaded(obj: &PublishedObject) {
    info!(store = %obj.store, size = obj.size, "uploaded {}", obj.key);
}
