//! Compiling with msbuild and running the produced self-test.

use std::path::{Path, PathBuf};
use std::process::Command;

use artifact_names::BuildVariant;

use super::{run_logged, ToolError};

/// One toolchain invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub solution: PathBuf,
    pub targets: Vec<String>,
    pub configuration: String,
    pub variant: BuildVariant,
}

impl BuildRequest {
    pub fn release(solution: &Path, targets: &[&str], variant: BuildVariant) -> Self {
        Self {
            solution: solution.to_path_buf(),
            targets: targets.iter().map(|t| t.to_string()).collect(),
            configuration: "Release".to_string(),
            variant,
        }
    }

    /// msbuild argument list.
    pub fn to_args(&self) -> Vec<String> {
        vec![
            self.solution.to_string_lossy().into_owned(),
            format!("/t:{}", self.targets.join(";")),
            format!(
                "/p:Configuration={};Platform={}",
                self.configuration,
                self.variant.platform()
            ),
            "/m".to_string(),
        ]
    }
}

/// Compiles solution targets.
pub trait Toolchain {
    fn build(&self, request: &BuildRequest) -> Result<(), ToolError>;
}

/// [`Toolchain`] backed by msbuild.
#[derive(Debug, Clone)]
pub struct MsBuild {
    program: PathBuf,
    repo_root: PathBuf,
}

impl MsBuild {
    pub fn new(program: impl Into<PathBuf>, repo_root: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            repo_root: repo_root.into(),
        }
    }
}

impl Toolchain for MsBuild {
    fn build(&self, request: &BuildRequest) -> Result<(), ToolError> {
        run_logged(
            Command::new(&self.program)
                .args(request.to_args())
                .current_dir(&self.repo_root),
        )
    }
}

/// Runs the self-test of a built variant.
pub trait TestRunner {
    fn run_tests(&self, out_dir: &Path) -> Result<(), ToolError>;
}

/// Runs `test_util.exe` from the variant output directory.
#[derive(Debug, Clone)]
pub struct SelfTestRunner {
    exe_name: String,
}

impl SelfTestRunner {
    pub fn new(exe_name: impl Into<String>) -> Self {
        Self {
            exe_name: exe_name.into(),
        }
    }
}

impl TestRunner for SelfTestRunner {
    fn run_tests(&self, out_dir: &Path) -> Result<(), ToolError> {
        let exe = out_dir.join(&self.exe_name);
        if !exe.exists() {
            return Err(ToolError::MissingOutput(exe));
        }
        run_logged(Command::new(&exe).current_dir(out_dir))
    }
}
