//! Build-configuration override
//!
//! Version metadata is compiled in through a header that is overwritten
//! before compiling and restored from source control when the guard is
//! dropped, on success and failure alike.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info};

use crate::tools::SourceControl;
use crate::version::VersionInfo;

/// Header contents embedding the revision id and pre-release counter.
pub fn override_contents(revision_id: &str, pre_release: Option<u64>) -> String {
    let mut s = format!("#define GIT_COMMIT_ID {}\n", revision_id);
    if let Some(ver) = pre_release {
        s.push_str(&format!("#define SVN_PRE_RELEASE_VER {}\n", ver));
    }
    s
}

/// Restores the override header when dropped.
pub struct BuildConfigOverride {
    scm: Arc<dyn SourceControl>,
    path: PathBuf,
}

impl BuildConfigOverride {
    pub fn write(
        scm: Arc<dyn SourceControl>,
        path: &Path,
        versions: &VersionInfo,
    ) -> io::Result<Self> {
        // guard first so a failed write is still reverted
        let guard = Self {
            scm,
            path: path.to_path_buf(),
        };
        fs::write(
            path,
            override_contents(&versions.revision_id, Some(versions.pre_release)),
        )?;
        info!("wrote build config {}", path.display());
        Ok(guard)
    }
}

impl Drop for BuildConfigOverride {
    fn drop(&mut self) {
        match self.scm.restore_file(&self.path) {
            Ok(()) => info!("restored {}", self.path.display()),
            Err(e) => error!("failed to restore {}: {}", self.path.display(), e),
        }
    }
}
