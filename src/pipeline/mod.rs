//! Release pipeline orchestration
//!
//! Stages run strictly one after another:
//! setup → clean → preflight → compile (per variant) → test → sign →
//! package → manifest → publish → prune.
//!
//! Every error aborts the run. The only failures that are logged and
//! swallowed are individual prune deletes and a missing signing tool.
//! Each run writes `artifacts/release_summary.json`, whatever the outcome.

mod build_config;
mod context;
mod preflight;
mod publish;
mod stage;
mod summary;

pub use build_config::{override_contents, BuildConfigOverride};
pub use context::{Mode, PipelineContext, RunOptions};
pub use preflight::{run_preflight, PreflightChecks};
pub use publish::{
    daily_info_files, decide_upload, file_digest, upload_plan, PublishedObject, UploadDecision,
    UploadItem,
};
pub use stage::{
    PipelineError, PipelineResult, Stage, StageRecord, StageStatus, StageTracker,
    StageTransitionError,
};
pub use summary::{Outcome, ReleaseSummary};

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use artifact_names::{ArtifactKind, ArtifactNameCodec, BuildVariant};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::{ConfigError, Environment, ReleaseConfig};
use crate::error::ReleaseResult;
use crate::layout::{
    target_outputs, BuildLayout, LZSA_EXE, LZSA_TARGET, MANIFEST_FILES, PDB_FILES,
    RELEASE_TARGETS, SIGNED_FILES, SMOKE_PDB_FILES, SMOKE_TARGETS, TEST_EXE,
};
use crate::manifest::{ManifestError, SizeManifest};
use crate::registry::{apply_prune, ArtifactRegistry, RetentionPolicy, VersionListing};
use crate::store::{AwsCliStore, DirStore, ObjectStore};
use crate::tools::{
    detect_signer, ArchiveEntry, Archiver, BuildRequest, CommandStringsCheck, GitCli,
    LzsaArchiver, MsBuild, SelfTestRunner, Signer, SourceControl, StringsCheck, TestRunner,
    Toolchain, ToolError, ZipArchiver,
};
use crate::version::{VersionInfo, VersionResolver};

/// External collaborators of a run.
pub struct Collaborators {
    pub scm: Arc<dyn SourceControl>,
    pub toolchain: Box<dyn Toolchain>,
    pub tests: Box<dyn TestRunner>,
    /// `None` when signing is unavailable
    pub signer: Option<Box<dyn Signer>>,
    pub zip: Box<dyn Archiver>,
    pub lzsa: Box<dyn Archiver>,
    pub strings: Box<dyn StringsCheck>,
    pub stores: Vec<Box<dyn ObjectStore>>,
}

impl Collaborators {
    /// Real tools for a checkout at `root`.
    ///
    /// Store credentials are checked here, before any build work starts.
    pub fn from_config(
        root: &Path,
        config: &ReleaseConfig,
        env: &Environment,
        with_stores: bool,
        store_dir: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let mut stores: Vec<Box<dyn ObjectStore>> = Vec::new();
        if with_stores {
            match store_dir {
                Some(dir) => stores.push(Box::new(DirStore::new("local", dir))),
                None => {
                    for store in &config.stores {
                        stores.push(Box::new(AwsCliStore::from_config(
                            store,
                            &config.tools.aws,
                            env,
                        )?));
                    }
                }
            }
        }

        let signer = detect_signer(&config.sign, env, root)
            .map(|s| Box::new(s) as Box<dyn Signer>);

        Ok(Self {
            scm: Arc::new(GitCli::new(root)),
            toolchain: Box::new(MsBuild::new(&config.tools.msbuild, root)),
            tests: Box::new(SelfTestRunner::new(TEST_EXE)),
            signer,
            zip: Box::new(ZipArchiver),
            lzsa: Box::new(LzsaArchiver::new(root.join(&config.tools.lzsa))),
            strings: Box::new(CommandStringsCheck::new(
                config.tools.strings_check.clone(),
                root,
            )),
            stores,
        })
    }
}

/// Remove build outputs. Safe to call on a clean tree.
pub fn clean(layout: &BuildLayout) -> io::Result<()> {
    for dir in [layout.out_dir(), layout.artifacts_dir()] {
        match fs::remove_dir_all(dir) {
            Ok(()) => info!("removed {}", dir.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Version listing of one store.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreListing {
    pub store: String,
    pub listing: VersionListing,
}

/// One release run.
pub struct Pipeline {
    ctx: PipelineContext,
    tools: Collaborators,
    registry: ArtifactRegistry,
    tracker: StageTracker,
    /// Indices of stores still missing the current version
    publish_targets: Vec<usize>,
    published: Vec<PublishedObject>,
    pruned: Vec<String>,
    prune_failures: usize,
}

impl Pipeline {
    pub fn new(ctx: PipelineContext, tools: Collaborators) -> ReleaseResult<Self> {
        let registry = ArtifactRegistry::new(
            ArtifactNameCodec::new()?,
            ctx.config.publish.remote_prefix.clone(),
            ctx.config.publish.max_list_results,
        );
        Ok(Self {
            ctx,
            tools,
            registry,
            tracker: StageTracker::new(),
            publish_targets: Vec::new(),
            published: Vec::new(),
            pruned: Vec::new(),
            prune_failures: 0,
        })
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    pub fn registry(&self) -> &ArtifactRegistry {
        &self.registry
    }

    /// Run the mode's stages and write the run summary.
    pub fn run(mut self) -> PipelineResult<ReleaseSummary> {
        info!(run_id = %self.ctx.run_id, mode = %self.ctx.mode, "starting release run");
        let start = Instant::now();
        let result = match self.ctx.mode {
            Mode::Smoke => self.run_smoke(),
            Mode::PreRelease | Mode::CiBuild => self.run_full_build(),
            Mode::CiUpload => self.run_ci_upload(),
            Mode::DeleteOldBuilds => self.run_delete_old_builds(),
            Mode::BuildLzsa => self.run_build_lzsa(),
        };
        let result = result.and_then(|()| {
            self.tracker
                .complete()
                .map_err(|e| PipelineError::new(Stage::Done, e))
        });

        let summary = ReleaseSummary::new(
            &self.ctx,
            self.tracker.records(),
            std::mem::take(&mut self.published),
            std::mem::take(&mut self.pruned),
            self.prune_failures,
            result.as_ref().err(),
        );
        let summary_path = self.ctx.layout.summary_path();
        if let Err(e) = summary.write_to_file(&summary_path) {
            warn!("failed to write {}: {}", summary_path.display(), e);
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match result {
            Ok(()) => {
                info!(elapsed_ms, "release run finished");
                Ok(summary)
            }
            Err(e) => {
                error!(elapsed_ms, "release run failed: {}", e);
                Err(e)
            }
        }
    }

    /// Print-friendly listing of every store.
    pub fn list_builds(&self) -> ReleaseResult<Vec<StoreListing>> {
        let mut out = Vec::new();
        for store in &self.tools.stores {
            out.push(StoreListing {
                store: store.name().to_string(),
                listing: self.registry.fetch_listing(store.as_ref())?,
            });
        }
        Ok(out)
    }

    fn stage<T, F>(&mut self, stage: Stage, f: F) -> PipelineResult<T>
    where
        F: FnOnce(&mut Self) -> ReleaseResult<T>,
    {
        self.tracker
            .enter(stage)
            .map_err(|e| PipelineError::new(stage, e))?;
        info!(%stage, "stage started");
        let start = Instant::now();
        match f(self) {
            Ok(value) => {
                let elapsed = start.elapsed();
                info!(%stage, elapsed_ms = elapsed.as_millis() as u64, "stage finished");
                self.tracker.succeed(elapsed);
                Ok(value)
            }
            Err(e) => {
                let elapsed = start.elapsed();
                error!(%stage, elapsed_ms = elapsed.as_millis() as u64, "stage failed: {}", e);
                self.tracker.fail(elapsed, &e);
                Err(PipelineError::new(stage, e))
            }
        }
    }

    // === Modes ===

    fn run_smoke(&mut self) -> PipelineResult<()> {
        self.stage(Stage::Setup, |p| p.setup())?;
        self.stage(Stage::Clean, |p| p.clean_outputs())?;
        let variant = BuildVariant::X64;
        self.stage(Stage::Compile(variant), |p| p.compile(variant, SMOKE_TARGETS))?;
        self.stage(Stage::Test, |p| p.test(&[variant]))?;
        self.stage(Stage::Package, |p| {
            let dir = p.ctx.layout.variant_dir(variant);
            p.archive(&*p.tools.lzsa, &dir, ArtifactKind::DebugSymbolArchiveLzsa, SMOKE_PDB_FILES)
        })
    }

    fn run_full_build(&mut self) -> PipelineResult<()> {
        let versions = self.stage(Stage::Setup, |p| p.setup())?;
        self.stage(Stage::Clean, |p| p.clean_outputs())?;
        // restored when dropped, whichever way this function returns
        let _build_config = self.stage(Stage::Preflight, |p| {
            p.preflight()?;
            let header = p.ctx.layout.build_config_header();
            Ok(BuildConfigOverride::write(p.tools.scm.clone(), header, &versions)?)
        })?;

        for variant in BuildVariant::ALL {
            self.stage(Stage::Compile(variant), |p| p.compile(variant, RELEASE_TARGETS))?;
        }
        self.stage(Stage::Test, |p| p.test(&BuildVariant::ALL))?;
        self.stage(Stage::Sign, |p| p.sign(&BuildVariant::ALL, SIGNED_FILES))?;
        self.stage(Stage::Package, |p| p.package())?;

        if self.ctx.mode == Mode::PreRelease {
            self.publish_and_prune(&versions)?;
        }
        Ok(())
    }

    fn run_ci_upload(&mut self) -> PipelineResult<()> {
        if let UploadDecision::Skipped(reason) = &self.ctx.upload {
            info!("skipping upload: {}", reason);
            return Ok(());
        }
        let versions = self.stage(Stage::Setup, |p| p.setup())?;
        self.publish_and_prune(&versions)
    }

    fn run_delete_old_builds(&mut self) -> PipelineResult<()> {
        self.stage(Stage::Setup, |p| p.check_stores())?;
        self.stage(Stage::Prune, |p| p.prune(None))
    }

    fn run_build_lzsa(&mut self) -> PipelineResult<()> {
        self.stage(Stage::Clean, |p| p.clean_outputs())?;
        let variant = BuildVariant::Win32;
        self.stage(Stage::Compile(variant), |p| p.compile(variant, &[LZSA_TARGET]))?;
        self.stage(Stage::Sign, |p| p.sign(&[variant], &[LZSA_EXE]))
    }

    fn publish_and_prune(&mut self, versions: &VersionInfo) -> PipelineResult<()> {
        self.stage(Stage::Manifest, |p| p.check_published(versions))?;
        self.stage(Stage::Publish, |p| p.publish(versions))?;
        if self.ctx.upload.is_enabled() {
            self.stage(Stage::Prune, |p| p.prune(Some(versions.pre_release)))?;
        }
        Ok(())
    }

    // === Stages ===

    fn setup(&mut self) -> ReleaseResult<VersionInfo> {
        self.check_stores()?;
        let resolver = VersionResolver::new(
            &*self.tools.scm,
            self.ctx.layout.version_header().to_path_buf(),
            self.ctx.config.version.pre_release_offset,
        );
        let versions = resolver.resolve()?;
        self.ctx.set_versions(&versions);
        Ok(versions)
    }

    fn check_stores(&self) -> ReleaseResult<()> {
        if self.ctx.mode.needs_stores(&self.ctx.upload) && self.tools.stores.is_empty() {
            return Err(ConfigError::ValidationError("no object stores configured".to_string()).into());
        }
        Ok(())
    }

    fn clean_outputs(&mut self) -> ReleaseResult<()> {
        clean(&self.ctx.layout)?;
        Ok(())
    }

    fn preflight(&mut self) -> ReleaseResult<()> {
        if self.ctx.config.tools.strings_check.is_empty() {
            return Err(ConfigError::ValidationError(
                "tools.strings_check is empty; release builds need a translation check".to_string(),
            )
            .into());
        }
        let checks = PreflightChecks {
            require_clean_tree: !self.ctx.options.no_clean_check,
            required_branch: match self.ctx.mode {
                Mode::PreRelease => Some(self.ctx.config.publish.release_branch.clone()),
                _ => None,
            },
        };
        run_preflight(&checks, &*self.tools.scm, &*self.tools.strings)
    }

    fn compile(&mut self, variant: BuildVariant, targets: &[&str]) -> ReleaseResult<()> {
        let request = BuildRequest::release(self.ctx.layout.solution(), targets, variant);
        self.tools.toolchain.build(&request)?;

        let dir = self.ctx.layout.variant_dir(variant);
        for file in targets.iter().flat_map(|t| target_outputs(t).iter()) {
            let path = dir.join(file);
            if !path.is_file() {
                return Err(ToolError::MissingOutput(path).into());
            }
        }
        Ok(())
    }

    fn test(&mut self, variants: &[BuildVariant]) -> ReleaseResult<()> {
        for &variant in variants {
            self.tools.tests.run_tests(&self.ctx.layout.variant_dir(variant))?;
        }
        Ok(())
    }

    fn sign(&mut self, variants: &[BuildVariant], files: &[&str]) -> ReleaseResult<()> {
        let Some(signer) = &self.tools.signer else {
            warn!("signing unavailable, binaries stay unsigned");
            self.tracker.skip_current("signing unavailable");
            return Ok(());
        };
        for &variant in variants {
            let dir = self.ctx.layout.variant_dir(variant);
            for file in files {
                signer.sign(&dir.join(file))?;
            }
        }
        Ok(())
    }

    fn archive(
        &self,
        archiver: &dyn Archiver,
        dir: &Path,
        kind: ArtifactKind,
        files: &[&str],
    ) -> ReleaseResult<()> {
        let entries: Vec<ArchiveEntry> = files.iter().map(|f| ArchiveEntry::in_dir(dir, f)).collect();
        let dest = dir.join(kind.local_file_name());
        archiver.create(&dest, &entries)?;
        if !dest.is_file() {
            return Err(ToolError::MissingOutput(dest).into());
        }
        info!("created {}", self.ctx.layout.display_relative(&dest));
        Ok(())
    }

    fn package(&mut self) -> ReleaseResult<()> {
        for variant in BuildVariant::ALL {
            let dir = self.ctx.layout.variant_dir(variant);
            self.archive(&*self.tools.zip, &dir, ArtifactKind::DebugSymbolArchiveZip, PDB_FILES)?;
            self.archive(&*self.tools.lzsa, &dir, ArtifactKind::DebugSymbolArchiveLzsa, PDB_FILES)?;
        }
        self.copy_artifacts()?;
        let manifest = SizeManifest::collect(&self.ctx.layout, &BuildVariant::ALL, MANIFEST_FILES)?;
        manifest.write(&self.ctx.layout.manifest_path())?;
        Ok(())
    }

    /// Copy per-variant published files to `artifacts/32` and `artifacts/64`.
    fn copy_artifacts(&self) -> ReleaseResult<()> {
        for variant in BuildVariant::ALL {
            let src_dir = self.ctx.layout.variant_dir(variant);
            let dst_dir = self.ctx.layout.artifacts_variant_dir(variant);
            fs::create_dir_all(&dst_dir)?;
            for kind in ArtifactKind::uploaded_per_variant() {
                let name = kind.local_file_name();
                fs::copy(src_dir.join(name), dst_dir.join(name))?;
            }
        }
        Ok(())
    }

    fn check_published(&mut self, versions: &VersionInfo) -> ReleaseResult<()> {
        self.publish_targets.clear();
        if let UploadDecision::Skipped(reason) = &self.ctx.upload {
            let reason = reason.clone();
            info!("not publishing: {}", reason);
            self.tracker.skip_current(reason);
            return Ok(());
        }

        let manifest = self.ctx.layout.manifest_path();
        if !manifest.is_file() {
            return Err(ManifestError::MissingFile(manifest).into());
        }

        for (idx, store) in self.tools.stores.iter().enumerate() {
            if self.registry.is_version_published(store.as_ref(), versions.pre_release)? {
                info!(
                    store = store.name(),
                    "version {} already published ({} exists)",
                    versions.pre_release,
                    self.registry.manifest_key(versions.pre_release)
                );
            } else {
                self.publish_targets.push(idx);
            }
        }
        Ok(())
    }

    fn publish(&mut self, versions: &VersionInfo) -> ReleaseResult<()> {
        if self.publish_targets.is_empty() {
            let reason = match &self.ctx.upload {
                UploadDecision::Skipped(reason) => reason.clone(),
                UploadDecision::Enabled => format!("version {} already published", versions.pre_release),
            };
            self.tracker.skip_current(reason);
            return Ok(());
        }

        let plan = upload_plan(
            &self.ctx.layout,
            &self.registry,
            &BuildVariant::ALL,
            versions.pre_release,
        );
        let mut digests = Vec::with_capacity(plan.len());
        for item in &plan {
            let (size, sha256) = file_digest(&item.local)
                .map_err(|_| ToolError::MissingOutput(item.local.clone()))?;
            digests.push((size, sha256));
        }
        let info_files = daily_info_files(&self.ctx.config.publish, versions, Utc::now().date_naive());

        let targets = self.publish_targets.clone();
        for idx in targets {
            let store = &self.tools.stores[idx];
            let start = Instant::now();
            for (item, (size, sha256)) in plan.iter().zip(&digests) {
                store.upload(&item.key, &item.local)?;
                let obj = PublishedObject {
                    store: store.name().to_string(),
                    key: item.key.clone(),
                    size: *size,
                    sha256: sha256.clone(),
                };
                publish::log_uploaded(&obj);
                self.published.push(obj);
            }
            for (key, content) in &info_files {
                store.upload_string(key, content)?;
            }
            info!(
                store = store.name(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "uploaded version {}",
                versions.pre_release
            );
        }
        Ok(())
    }

    fn prune(&mut self, protect: Option<u64>) -> ReleaseResult<()> {
        let mut policy = RetentionPolicy::keep_last_n(self.ctx.config.publish.retain);
        if let Some(version) = protect {
            policy = policy.protecting(version);
        }
        if self.ctx.options.dry_run_prune {
            policy = policy.with_dry_run();
        }

        for store in &self.tools.stores {
            let listing = self.registry.fetch_listing(store.as_ref())?;
            let ops = policy.plan(&listing.groups);
            info!(
                store = store.name(),
                versions = listing.groups.len(),
                deletes = ops.len(),
                "pruning old versions"
            );
            let report = apply_prune(store.as_ref(), &ops, policy.dry_run);
            self.prune_failures += report.failed.len();
            self.pruned.extend(report.deleted);
        }
        Ok(())
    }
}
