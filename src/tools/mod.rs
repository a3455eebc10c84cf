//! External tool adapters
//!
//! Each external collaborator of a release run sits behind a small trait
//! so stages can be exercised against fakes:
//! - [`SourceControl`]: revision counter, dirty-tree and branch checks, file restore
//! - [`Toolchain`]: compiles solution targets for one variant
//! - [`TestRunner`]: runs the self-test executable of a variant
//! - [`Signer`]: signs a binary in place
//! - [`Archiver`]: packs files into one archive (zip in-process, lzsa via MakeLZSA)
//! - [`StringsCheck`]: verifies translation strings are current

mod archive;
mod git;
mod msbuild;
mod signer;
mod strings;

pub use archive::{ArchiveEntry, Archiver, LzsaArchiver, ZipArchiver};
pub use git::{GitCli, SourceControl};
pub use msbuild::{BuildRequest, MsBuild, SelfTestRunner, TestRunner, Toolchain};
pub use signer::{detect_signer, SignTool, Signer};
pub use strings::{CommandStringsCheck, StringsCheck};

use std::io;
use std::path::PathBuf;
use std::process::Command;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info};

/// External tool failures
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}{}", format_detail(.detail))]
    ExitStatus {
        program: String,
        status: String,
        detail: String,
    },

    #[error("expected build output missing: {}", .0.display())]
    MissingOutput(PathBuf),

    #[error("tool not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unexpected output from {program}: {message}")]
    BadOutput { program: String, message: String },

    #[error("archive error: {0}")]
    Archive(String),

    #[error("no command configured for {0}")]
    NotConfigured(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn format_detail(detail: &str) -> String {
    if detail.is_empty() {
        String::new()
    } else {
        format!(": {}", detail)
    }
}

fn describe(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}

fn program_name(cmd: &Command) -> String {
    cmd.get_program().to_string_lossy().into_owned()
}

/// Run a command with inherited stdio, failing on non-zero exit.
pub fn run_logged(cmd: &mut Command) -> Result<(), ToolError> {
    let line = describe(cmd);
    info!("> {}", line);
    let start = Instant::now();
    let status = cmd.status().map_err(|source| ToolError::Launch {
        program: program_name(cmd),
        source,
    })?;
    debug!(elapsed_ms = start.elapsed().as_millis() as u64, "finished {}", line);
    if !status.success() {
        return Err(ToolError::ExitStatus {
            program: program_name(cmd),
            status: status.to_string(),
            detail: String::new(),
        });
    }
    Ok(())
}

/// Run a command and return its trimmed stdout.
pub fn capture(cmd: &mut Command) -> Result<String, ToolError> {
    capture_raw(cmd).map(|out| out.trim().to_string())
}

/// Run a command and return its stdout unchanged.
pub fn capture_raw(cmd: &mut Command) -> Result<String, ToolError> {
    debug!("> {}", describe(cmd));
    let output = cmd.output().map_err(|source| ToolError::Launch {
        program: program_name(cmd),
        source,
    })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ToolError::ExitStatus {
            program: program_name(cmd),
            status: output.status.to_string(),
            detail: stderr.trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
