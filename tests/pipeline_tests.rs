//! Release pipeline tests
//!
//! Full runs against fake tools and an in-memory store, in a scratch
//! checkout that only holds the two headers the pipeline touches.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use sumatra_release::mock::{
    CallLog, FakeArchiver, FakeSigner, FakeSourceControl, FakeStringsCheck, FakeTestRunner,
    FakeToolchain, MemoryStore,
};
use sumatra_release::pipeline::{
    Collaborators, Mode, Outcome, Pipeline, PipelineContext, ReleaseSummary, RunOptions, Stage,
    StageStatus, UploadDecision,
};
use sumatra_release::{BuildVariant, Environment, ErrorCategory, ReleaseConfig};

const REVISION: &str = "0123456789abcdef0123456789abcdef01234567";
const BUILD_CONFIG: &str = "#define GIT_COMMIT_ID\n";

struct Fixture {
    dir: TempDir,
    log: CallLog,
    store: MemoryStore,
}

impl Fixture {
    fn new() -> Self {
        Self::with_version("3.6")
    }

    fn with_version(version: &str) -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/utils")).unwrap();
        fs::write(
            dir.path().join("src/Version.h"),
            format!("#define CURR_VERSION {}\n#define CURR_VERSION_COMMA 3,6,0\n", version),
        )
        .unwrap();
        fs::write(dir.path().join("src/utils/BuildConfig.h"), BUILD_CONFIG).unwrap();
        Self {
            dir,
            log: CallLog::new(),
            store: MemoryStore::new("mem"),
        }
    }

    fn build_config_path(&self) -> PathBuf {
        self.dir.path().join("src/utils/BuildConfig.h")
    }

    fn scm(&self, count: u64) -> FakeSourceControl {
        FakeSourceControl::new(count, REVISION)
            .with_committed_file(&self.build_config_path(), BUILD_CONFIG)
            .with_log(&self.log)
    }

    fn tools(&self, scm: FakeSourceControl) -> Collaborators {
        Collaborators {
            scm: Arc::new(scm),
            toolchain: Box::new(FakeToolchain::new(self.dir.path().join("out"), &self.log)),
            tests: Box::new(FakeTestRunner::new(&self.log)),
            signer: Some(Box::new(FakeSigner::new(&self.log))),
            zip: Box::new(FakeArchiver::new(&self.log)),
            lzsa: Box::new(FakeArchiver::new(&self.log)),
            strings: Box::new(FakeStringsCheck::new(&self.log)),
            stores: vec![Box::new(self.store.clone())],
        }
    }

    fn context(&self, mode: Mode, options: RunOptions, env: Environment) -> PipelineContext {
        PipelineContext::new(
            self.dir.path(),
            ReleaseConfig::builtin().unwrap(),
            mode,
            env,
            options,
        )
    }

    fn pipeline(&self, mode: Mode, options: RunOptions, tools: Collaborators) -> Pipeline {
        let ctx = self.context(mode, options, Environment::default());
        Pipeline::new(ctx, tools).unwrap()
    }

    fn read_summary(&self) -> ReleaseSummary {
        let json = fs::read_to_string(self.dir.path().join("artifacts/release_summary.json")).unwrap();
        ReleaseSummary::from_json(&json).unwrap()
    }
}

fn upload() -> RunOptions {
    RunOptions {
        upload: true,
        ..Default::default()
    }
}

fn stage_status(summary: &ReleaseSummary, stage: &str) -> Option<StageStatus> {
    summary
        .stages
        .iter()
        .find(|r| r.stage == stage)
        .map(|r| r.status)
}

// =============================================================================
// Pre-release publish
// =============================================================================

#[test]
fn test_pre_release_publishes_every_file_once() {
    let fx = Fixture::new();
    let pipeline = fx.pipeline(Mode::PreRelease, upload(), fx.tools(fx.scm(200)));
    let manifest_key = pipeline.registry().manifest_key(200);

    let summary = pipeline.run().unwrap();
    assert_eq!(summary.outcome, Outcome::Succeeded);
    assert_eq!(summary.versions.as_ref().unwrap().pre_release, 200);

    let versioned: Vec<String> = fx
        .store
        .uploaded_keys()
        .into_iter()
        .filter(|k| k.starts_with("sumatrapdf/prerel/"))
        .collect();
    assert_eq!(versioned.len(), 9, "uploaded: {:?}", versioned);
    assert_eq!(versioned.last(), Some(&manifest_key), "manifest goes up last");
    assert_eq!(summary.published.len(), 9);

    assert!(fx.store.contains("sumatrapdf/sumpdf-daily-latest.txt"));
    assert_eq!(
        fx.store.get("sumatrapdf/sumpdf-daily-latest.txt").unwrap(),
        b"200".to_vec()
    );
    assert!(fx.store.contains("sumatrapdf/sumadaily.js"));
}

#[test]
fn test_rerun_of_published_version_uploads_nothing() {
    let fx = Fixture::new();
    fx.pipeline(Mode::PreRelease, upload(), fx.tools(fx.scm(200)))
        .run()
        .unwrap();
    let first = fx.store.upload_count();

    let summary = fx
        .pipeline(Mode::PreRelease, upload(), fx.tools(fx.scm(200)))
        .run()
        .unwrap();
    assert_eq!(fx.store.upload_count(), first);
    assert_eq!(summary.outcome, Outcome::Succeeded);
    assert_eq!(stage_status(&summary, "publish"), Some(StageStatus::Skipped));
    assert!(summary.published.is_empty());
}

#[test]
fn test_stages_run_in_order() {
    let fx = Fixture::new();
    fx.pipeline(Mode::PreRelease, upload(), fx.tools(fx.scm(200)))
        .run()
        .unwrap();

    let strings = fx.log.position("strings").unwrap();
    let compile32 = fx.log.position("compile win32").unwrap();
    let compile64 = fx.log.position("compile x64").unwrap();
    let test = fx.log.position("test rel32").unwrap();
    let sign = fx.log.position("sign ").unwrap();
    let archive = fx.log.position("archive ").unwrap();
    assert!(strings < compile32);
    assert!(compile32 < compile64);
    assert!(compile64 < test);
    assert!(test < sign);
    assert!(sign < archive);

    let summary = fx.read_summary();
    let stages: Vec<&str> = summary.stages.iter().map(|r| r.stage.as_str()).collect();
    assert_eq!(
        stages,
        vec![
            "setup",
            "clean",
            "preflight",
            "compile-win32",
            "compile-x64",
            "test",
            "sign",
            "package",
            "manifest",
            "publish",
            "prune"
        ]
    );
}

#[test]
fn test_pre_release_without_upload_publishes_nothing() {
    let fx = Fixture::new();
    let summary = fx
        .pipeline(Mode::PreRelease, RunOptions::default(), fx.tools(fx.scm(200)))
        .run()
        .unwrap();

    assert!(matches!(summary.upload, UploadDecision::Skipped(_)));
    assert_eq!(fx.store.upload_count(), 0);
    assert_eq!(stage_status(&summary, "manifest"), Some(StageStatus::Skipped));
    assert!(fx.dir.path().join("artifacts/manifest.txt").is_file());
}

#[test]
fn test_publish_prunes_old_versions_but_keeps_current() {
    let fx = Fixture::new();
    for v in 1..=12u64 {
        fx.store.insert(
            &format!("sumatrapdf/prerel/SumatraPDF-prerelease-{}.exe", v),
            b"x",
        );
        fx.store.insert(
            &format!("sumatrapdf/prerel/SumatraPDF-prerelease-{}-manifest.txt", v),
            b"m",
        );
    }

    let summary = fx
        .pipeline(Mode::PreRelease, upload(), fx.tools(fx.scm(200)))
        .run()
        .unwrap();

    // 13 versions with 200 included, the newest 10 stay
    let deleted = fx.store.deleted_keys();
    assert_eq!(
        deleted,
        vec![
            "sumatrapdf/prerel/SumatraPDF-prerelease-3.exe".to_string(),
            "sumatrapdf/prerel/SumatraPDF-prerelease-2.exe".to_string(),
            "sumatrapdf/prerel/SumatraPDF-prerelease-1.exe".to_string(),
        ]
    );
    assert!(fx.store.contains("sumatrapdf/prerel/SumatraPDF-prerelease-1-manifest.txt"));
    assert_eq!(summary.pruned.len(), 3);
    assert_eq!(summary.prune_failures, 0);
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_dirty_tree_stops_before_compile() {
    let fx = Fixture::new();
    let scm = fx.scm(200).with_changes(&["src/SumatraPDF.cpp"]);
    let err = fx
        .pipeline(Mode::PreRelease, upload(), fx.tools(scm))
        .run()
        .unwrap_err();

    assert_eq!(err.stage, Stage::Preflight);
    assert_eq!(err.source.category(), ErrorCategory::Policy);
    assert_eq!(err.exit_code(), 4);
    assert!(!fx.log.any("compile"));
    assert_eq!(fx.store.upload_count(), 0);

    let summary = fx.read_summary();
    assert_eq!(summary.outcome, Outcome::Failed);
    assert_eq!(summary.exit_code, 4);
    assert_eq!(stage_status(&summary, "preflight"), Some(StageStatus::Failed));
}

#[test]
fn test_no_clean_check_allows_dirty_tree() {
    let fx = Fixture::new();
    let scm = fx.scm(200).with_changes(&["src/SumatraPDF.cpp"]);
    let options = RunOptions {
        no_clean_check: true,
        ..Default::default()
    };
    let summary = fx.pipeline(Mode::CiBuild, options, fx.tools(scm)).run().unwrap();
    assert_eq!(summary.outcome, Outcome::Succeeded);
    assert!(fx.log.any("compile"));
}

#[test]
fn test_wrong_branch_rejected_for_pre_release() {
    let fx = Fixture::new();
    let scm = fx.scm(200).on_branch("feature");
    let err = fx
        .pipeline(Mode::PreRelease, upload(), fx.tools(scm))
        .run()
        .unwrap_err();
    assert_eq!(err.exit_code(), 4);
    assert!(err.to_string().contains("feature"));
}

#[test]
fn test_unconfigured_translation_check_fails_closed() {
    let fx = Fixture::new();
    let mut ctx = fx.context(Mode::CiBuild, RunOptions::default(), Environment::default());
    ctx.config.tools.strings_check.clear();
    let err = Pipeline::new(ctx, fx.tools(fx.scm(200)))
        .unwrap()
        .run()
        .unwrap_err();

    assert_eq!(err.stage, Stage::Preflight);
    assert_eq!(err.source.category(), ErrorCategory::Config);
    assert_eq!(err.exit_code(), 1);
    assert!(err.to_string().contains("strings_check"));
    assert!(!fx.log.any("strings"));
    assert!(!fx.log.any("compile"));
}

#[test]
fn test_regenerated_translations_stop_the_build() {
    let fx = Fixture::new();
    let scm = fx.scm(200);
    let mut tools = fx.tools(scm.clone());
    tools.strings = Box::new(FakeStringsCheck::new(&fx.log).regenerating(&scm, "src/Trans_sumatra_txt.cpp"));
    let err = fx
        .pipeline(Mode::PreRelease, upload(), tools)
        .run()
        .unwrap_err();

    assert_eq!(err.stage, Stage::Preflight);
    assert_eq!(err.exit_code(), 4);
    assert!(err.to_string().contains("src/Trans_sumatra_txt.cpp"));
    assert!(!fx.log.any("compile"));
}

#[test]
fn test_upload_failure_leaves_version_unpublished() {
    use sumatra_release::mock::{FailureConfig, StoreOp};

    let fx = Fixture::new();
    fx.store.inject_failure(
        StoreOp::Upload,
        FailureConfig::for_key("sumatrapdf/prerel/SumatraPDF-prerelease-200-64.exe"),
    );
    let err = fx
        .pipeline(Mode::PreRelease, upload(), fx.tools(fx.scm(200)))
        .run()
        .unwrap_err();

    assert_eq!(err.stage, Stage::Publish);
    assert_eq!(err.source.category(), ErrorCategory::Store);
    assert_eq!(err.exit_code(), 3);
    // the manifest goes last, so an aborted publish never marks the version done
    assert!(!fx.store.contains("sumatrapdf/prerel/SumatraPDF-prerelease-200-manifest.txt"));
    assert!(fx.store.deleted_keys().is_empty());

    let summary = fx.read_summary();
    assert_eq!(summary.outcome, Outcome::Failed);
    assert_eq!(summary.exit_code, 3);
    assert_eq!(stage_status(&summary, "publish"), Some(StageStatus::Failed));
    assert_eq!(stage_status(&summary, "prune"), None);
}

#[test]
fn test_build_config_restored_after_compile_failure() {
    let fx = Fixture::new();
    let mut tools = fx.tools(fx.scm(200));
    tools.toolchain = Box::new(
        FakeToolchain::new(fx.dir.path().join("out"), &fx.log).failing_for(BuildVariant::X64),
    );

    let err = fx.pipeline(Mode::CiBuild, RunOptions::default(), tools).run().unwrap_err();
    assert_eq!(err.stage, Stage::Compile(BuildVariant::X64));
    assert_eq!(err.source.category(), ErrorCategory::Tool);
    assert_eq!(err.exit_code(), 2);

    assert!(fx.log.any("git restore"));
    assert_eq!(fs::read_to_string(fx.build_config_path()).unwrap(), BUILD_CONFIG);
}

#[test]
fn test_build_config_restored_after_success() {
    let fx = Fixture::new();
    fx.pipeline(Mode::CiBuild, RunOptions::default(), fx.tools(fx.scm(200)))
        .run()
        .unwrap();
    assert_eq!(fs::read_to_string(fx.build_config_path()).unwrap(), BUILD_CONFIG);
}

#[test]
fn test_missing_build_output_fails_compile() {
    let fx = Fixture::new();
    let mut tools = fx.tools(fx.scm(200));
    tools.toolchain = Box::new(
        FakeToolchain::new(fx.dir.path().join("out"), &fx.log).omitting("PdfPreview.dll"),
    );
    let err = fx.pipeline(Mode::CiBuild, RunOptions::default(), tools).run().unwrap_err();
    assert_eq!(err.stage, Stage::Compile(BuildVariant::Win32));
    assert!(err.to_string().contains("PdfPreview.dll"));
}

#[test]
fn test_malformed_version_is_config_error() {
    let fx = Fixture::with_version("3.6.0.1");
    let err = fx
        .pipeline(Mode::PreRelease, upload(), fx.tools(fx.scm(200)))
        .run()
        .unwrap_err();
    assert_eq!(err.stage, Stage::Setup);
    assert_eq!(err.exit_code(), 1);
    assert!(!fx.log.any("compile"));
}

#[test]
fn test_failed_test_run_blocks_signing() {
    let fx = Fixture::new();
    let mut tools = fx.tools(fx.scm(200));
    tools.tests = Box::new(FakeTestRunner::new(&fx.log).failing());
    let err = fx.pipeline(Mode::CiBuild, RunOptions::default(), tools).run().unwrap_err();
    assert_eq!(err.stage, Stage::Test);
    assert!(!fx.log.any("sign"));
}

#[test]
fn test_signing_failure_aborts() {
    let fx = Fixture::new();
    let mut tools = fx.tools(fx.scm(200));
    tools.signer = Some(Box::new(FakeSigner::new(&fx.log).failing()));
    let err = fx.pipeline(Mode::CiBuild, RunOptions::default(), tools).run().unwrap_err();
    assert_eq!(err.stage, Stage::Sign);
    assert!(!fx.log.any("archive"));
}

#[test]
fn test_missing_signer_skips_sign_stage() {
    let fx = Fixture::new();
    let mut tools = fx.tools(fx.scm(200));
    tools.signer = None;
    let summary = fx
        .pipeline(Mode::CiBuild, RunOptions::default(), tools)
        .run()
        .unwrap();
    assert_eq!(stage_status(&summary, "sign"), Some(StageStatus::Skipped));
    assert!(!fx.log.any("sign"));
    assert!(fx.log.any("archive"));
}

// =============================================================================
// Other modes
// =============================================================================

#[test]
fn test_ci_build_never_uploads() {
    let fx = Fixture::new();
    let summary = fx
        .pipeline(Mode::CiBuild, upload(), fx.tools(fx.scm(200)))
        .run()
        .unwrap();
    assert!(matches!(summary.upload, UploadDecision::Skipped(_)));
    assert_eq!(fx.store.upload_count(), 0);
    assert!(!fx.log.any("git branch"));
}

#[test]
fn test_ci_upload_gate_skips_outside_canonical_push() {
    let fx = Fixture::new();
    let env = Environment::from_pairs([
        ("GITHUB_REPOSITORY", "someone/sumatrapdf"),
        ("GITHUB_EVENT_NAME", "push"),
        ("GITHUB_REF", "refs/heads/master"),
    ]);
    let ctx = fx.context(Mode::CiUpload, upload(), env);
    let summary = Pipeline::new(ctx, fx.tools(fx.scm(200))).unwrap().run().unwrap();

    assert!(matches!(summary.upload, UploadDecision::Skipped(_)));
    assert!(summary.stages.is_empty());
    assert_eq!(fx.store.upload_count(), 0);
}

#[test]
fn test_ci_upload_publishes_earlier_build() {
    let fx = Fixture::new();
    fx.pipeline(Mode::CiBuild, RunOptions::default(), fx.tools(fx.scm(200)))
        .run()
        .unwrap();

    let env = Environment::from_pairs([
        ("GITHUB_REPOSITORY", "sumatrapdfreader/sumatrapdf"),
        ("GITHUB_EVENT_NAME", "push"),
        ("GITHUB_REF", "refs/heads/master"),
    ]);
    let ctx = fx.context(Mode::CiUpload, upload(), env);
    let summary = Pipeline::new(ctx, fx.tools(fx.scm(200))).unwrap().run().unwrap();

    assert_eq!(summary.upload, UploadDecision::Enabled);
    assert_eq!(summary.published.len(), 9);
    // nothing is rebuilt
    let compiles = fx.log.calls().iter().filter(|c| c.starts_with("compile")).count();
    assert_eq!(compiles, 2);
}

#[test]
fn test_ci_upload_without_build_output_fails() {
    let fx = Fixture::new();
    let env = Environment::from_pairs([
        ("GITHUB_REPOSITORY", "sumatrapdfreader/sumatrapdf"),
        ("GITHUB_EVENT_NAME", "push"),
        ("GITHUB_REF", "refs/heads/master"),
    ]);
    let ctx = fx.context(Mode::CiUpload, upload(), env);
    let err = Pipeline::new(ctx, fx.tools(fx.scm(200))).unwrap().run().unwrap_err();
    assert_eq!(err.stage, Stage::Manifest);
    assert_eq!(fx.store.upload_count(), 0);
}

#[test]
fn test_smoke_builds_x64_only() {
    let fx = Fixture::new();
    let summary = fx
        .pipeline(Mode::Smoke, RunOptions::default(), fx.tools(fx.scm(200)))
        .run()
        .unwrap();
    assert_eq!(summary.outcome, Outcome::Succeeded);
    assert_eq!(
        fx.log.calls().iter().filter(|c| c.starts_with("compile")).collect::<Vec<_>>(),
        vec!["compile x64 SumatraPDF-dll;test_util"]
    );
    assert!(fx.log.any("test rel64"));
    assert!(fx.dir.path().join("out/rel64/SumatraPDF.pdb.lzsa").is_file());
    assert_eq!(fx.store.upload_count(), 0);
}

#[test]
fn test_delete_old_builds_dry_run_deletes_nothing() {
    let fx = Fixture::new();
    for v in 1..=12u64 {
        fx.store.insert(
            &format!("sumatrapdf/prerel/SumatraPDF-prerelease-{}.exe", v),
            b"x",
        );
    }
    let options = RunOptions {
        dry_run_prune: true,
        ..Default::default()
    };
    let summary = fx
        .pipeline(Mode::DeleteOldBuilds, options, fx.tools(fx.scm(200)))
        .run()
        .unwrap();
    assert!(fx.store.deleted_keys().is_empty());
    assert_eq!(summary.pruned.len(), 2);
    assert!(summary.versions.is_none());
}

#[test]
fn test_delete_old_builds_tolerates_failed_delete() {
    use sumatra_release::mock::{FailureConfig, StoreOp};

    let fx = Fixture::new();
    for v in 1..=12u64 {
        fx.store.insert(
            &format!("sumatrapdf/prerel/SumatraPDF-prerelease-{}.exe", v),
            b"x",
        );
    }
    fx.store.inject_failure(
        StoreOp::Delete,
        FailureConfig::for_key("sumatrapdf/prerel/SumatraPDF-prerelease-2.exe"),
    );
    let summary = fx
        .pipeline(Mode::DeleteOldBuilds, RunOptions::default(), fx.tools(fx.scm(200)))
        .run()
        .unwrap();
    assert_eq!(summary.prune_failures, 1);
    assert_eq!(
        fx.store.deleted_keys(),
        vec!["sumatrapdf/prerel/SumatraPDF-prerelease-1.exe".to_string()]
    );
}

#[test]
fn test_summary_written_on_success() {
    let fx = Fixture::new();
    fx.pipeline(Mode::CiBuild, RunOptions::default(), fx.tools(fx.scm(200)))
        .run()
        .unwrap();
    let summary = fx.read_summary();
    assert_eq!(summary.schema_version, 1);
    assert_eq!(summary.schema_id, "sumatra-release/release_summary@1");
    assert_eq!(summary.outcome, Outcome::Succeeded);
    assert_eq!(summary.exit_code, 0);
    assert_eq!(summary.versions.unwrap().product_version, "3.6");
}
