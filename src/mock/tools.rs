//! Fake external tools.
//!
//! Every fake records what it was asked to do in a shared [`CallLog`] so
//! tests can assert on stage ordering across collaborators.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use artifact_names::BuildVariant;

use crate::layout::{target_outputs, PDB_FILES};
use crate::tools::{
    ArchiveEntry, Archiver, BuildRequest, SourceControl, Signer, StringsCheck, TestRunner,
    Toolchain, ToolError,
};

/// Ordered record of fake tool invocations.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Whether any call starts with `prefix`.
    pub fn any(&self, prefix: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|c| c.starts_with(prefix))
    }

    /// Index of the first call starting with `prefix`.
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.calls.lock().unwrap().iter().position(|c| c.starts_with(prefix))
    }
}

fn fail(program: &str, message: &str) -> ToolError {
    ToolError::ExitStatus {
        program: program.to_string(),
        status: "exit code: 1".to_string(),
        detail: message.to_string(),
    }
}

/// Source control with a fixed history.
#[derive(Debug, Clone)]
pub struct FakeSourceControl {
    count: u64,
    revision: String,
    branch: String,
    changes: Arc<Mutex<Vec<String>>>,
    has_repository: bool,
    committed: Arc<Mutex<HashMap<PathBuf, String>>>,
    log: CallLog,
}

impl FakeSourceControl {
    pub fn new(count: u64, revision: &str) -> Self {
        Self {
            count,
            revision: revision.to_string(),
            branch: "master".to_string(),
            changes: Arc::new(Mutex::new(Vec::new())),
            has_repository: true,
            committed: Arc::new(Mutex::new(HashMap::new())),
            log: CallLog::new(),
        }
    }

    /// Behave like a directory outside any repository.
    pub fn without_repository(mut self) -> Self {
        self.has_repository = false;
        self
    }

    pub fn on_branch(mut self, branch: &str) -> Self {
        self.branch = branch.to_string();
        self
    }

    pub fn with_changes(self, paths: &[&str]) -> Self {
        self.changes
            .lock()
            .unwrap()
            .extend(paths.iter().map(|p| p.to_string()));
        self
    }

    /// Report `path` as modified from now on, in every clone.
    pub fn mark_changed(&self, path: &str) {
        self.changes.lock().unwrap().push(path.to_string());
    }

    /// Contents `restore_file` writes back for `path`.
    pub fn with_committed_file(self, path: &Path, contents: &str) -> Self {
        self.committed
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), contents.to_string());
        self
    }

    pub fn with_log(mut self, log: &CallLog) -> Self {
        self.log = log.clone();
        self
    }

    fn check_repository(&self) -> Result<(), ToolError> {
        if self.has_repository {
            Ok(())
        } else {
            Err(fail("git", "fatal: not a git repository"))
        }
    }
}

impl SourceControl for FakeSourceControl {
    fn revision_count(&self) -> Result<u64, ToolError> {
        self.check_repository()?;
        Ok(self.count)
    }

    fn head_revision(&self) -> Result<String, ToolError> {
        self.check_repository()?;
        Ok(self.revision.clone())
    }

    fn uncommitted_changes(&self) -> Result<Vec<String>, ToolError> {
        self.check_repository()?;
        self.log.record("git status");
        Ok(self.changes.lock().unwrap().clone())
    }

    fn current_branch(&self) -> Result<String, ToolError> {
        self.check_repository()?;
        self.log.record("git branch");
        Ok(self.branch.clone())
    }

    fn restore_file(&self, path: &Path) -> Result<(), ToolError> {
        self.check_repository()?;
        self.log.record(format!("git restore {}", path.display()));
        if let Some(contents) = self.committed.lock().unwrap().get(path) {
            fs::write(path, contents)?;
        }
        Ok(())
    }
}

/// Toolchain that writes placeholder outputs.
#[derive(Debug, Clone)]
pub struct FakeToolchain {
    out_dir: PathBuf,
    fail_variant: Option<BuildVariant>,
    omit: Vec<String>,
    log: CallLog,
}

impl FakeToolchain {
    pub fn new(out_dir: impl Into<PathBuf>, log: &CallLog) -> Self {
        Self {
            out_dir: out_dir.into(),
            fail_variant: None,
            omit: Vec::new(),
            log: log.clone(),
        }
    }

    pub fn failing_for(mut self, variant: BuildVariant) -> Self {
        self.fail_variant = Some(variant);
        self
    }

    /// Never produce `file_name`.
    pub fn omitting(mut self, file_name: &str) -> Self {
        self.omit.push(file_name.to_string());
        self
    }
}

impl Toolchain for FakeToolchain {
    fn build(&self, request: &BuildRequest) -> Result<(), ToolError> {
        self.log.record(format!(
            "compile {} {}",
            request.variant,
            request.targets.join(";")
        ));
        if self.fail_variant == Some(request.variant) {
            return Err(fail("msbuild", "error C2065: undeclared identifier"));
        }
        let dir = self.out_dir.join(request.variant.out_dir_name());
        fs::create_dir_all(&dir)?;
        let outputs = request
            .targets
            .iter()
            .flat_map(|t| target_outputs(t).iter())
            .chain(PDB_FILES.iter());
        for file in outputs {
            if self.omit.iter().any(|o| o == file) {
                continue;
            }
            fs::write(dir.join(file), format!("{} {}", request.variant, file))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FakeTestRunner {
    fail: bool,
    log: CallLog,
}

impl FakeTestRunner {
    pub fn new(log: &CallLog) -> Self {
        Self {
            fail: false,
            log: log.clone(),
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl TestRunner for FakeTestRunner {
    fn run_tests(&self, out_dir: &Path) -> Result<(), ToolError> {
        let dir = out_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.log.record(format!("test {}", dir));
        if self.fail {
            return Err(fail("test_util.exe", "1 test failed"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FakeSigner {
    fail: bool,
    log: CallLog,
}

impl FakeSigner {
    pub fn new(log: &CallLog) -> Self {
        Self {
            fail: false,
            log: log.clone(),
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl Signer for FakeSigner {
    fn sign(&self, path: &Path) -> Result<(), ToolError> {
        self.log.record(format!("sign {}", path.display()));
        if !path.exists() {
            return Err(ToolError::MissingOutput(path.to_path_buf()));
        }
        if self.fail {
            return Err(fail("signtool", "SignTool Error: No certificates were found"));
        }
        Ok(())
    }
}

/// Writes a text archive listing its entries.
#[derive(Debug, Clone)]
pub struct FakeArchiver {
    log: CallLog,
}

impl FakeArchiver {
    pub fn new(log: &CallLog) -> Self {
        Self { log: log.clone() }
    }
}

impl Archiver for FakeArchiver {
    fn create(&self, dest: &Path, entries: &[ArchiveEntry]) -> Result<(), ToolError> {
        self.log.record(format!("archive {}", dest.display()));
        if let Some(missing) = entries.iter().find(|e| !e.local.is_file()) {
            return Err(ToolError::MissingOutput(missing.local.clone()));
        }
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        fs::write(dest, names.join("\n"))?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FakeStringsCheck {
    stale: bool,
    rewrites: Option<(FakeSourceControl, String)>,
    log: CallLog,
}

impl FakeStringsCheck {
    pub fn new(log: &CallLog) -> Self {
        Self {
            stale: false,
            rewrites: None,
            log: log.clone(),
        }
    }

    pub fn stale(mut self) -> Self {
        self.stale = true;
        self
    }

    /// Succeed but leave `path` modified in `scm`.
    pub fn regenerating(mut self, scm: &FakeSourceControl, path: &str) -> Self {
        self.rewrites = Some((scm.clone(), path.to_string()));
        self
    }
}

impl StringsCheck for FakeStringsCheck {
    fn verify(&self) -> Result<(), ToolError> {
        self.log.record("strings");
        if self.stale {
            return Err(fail("update_translations", "strings need regenerating"));
        }
        if let Some((scm, path)) = &self.rewrites {
            scm.mark_changed(path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fake_toolchain_writes_outputs() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::new();
        let toolchain = FakeToolchain::new(dir.path(), &log).omitting("PdfPreview.dll");
        let req = BuildRequest::release(
            Path::new("SumatraPDF.sln"),
            &["PdfFilter", "PdfPreview"],
            BuildVariant::Win32,
        );
        toolchain.build(&req).unwrap();

        let out = dir.path().join("rel32");
        assert!(out.join("PdfFilter.dll").exists());
        assert!(!out.join("PdfPreview.dll").exists());
        assert!(out.join("SumatraPDF.pdb").exists());
        assert_eq!(log.calls(), vec!["compile win32 PdfFilter;PdfPreview"]);
    }

    #[test]
    fn test_restore_file_writes_committed_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("BuildConfig.h");
        fs::write(&path, "#define GIT_COMMIT_ID abc\n").unwrap();
        let scm = FakeSourceControl::new(1, "abc").with_committed_file(&path, "");
        scm.restore_file(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }
}
