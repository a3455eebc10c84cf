//! Version resolution
//!
//! A release run is tagged with three identifiers: the pre-release
//! counter (commit count plus a configured offset), the full revision id
//! of HEAD, and the product version from `#define CURR_VERSION` in the
//! version header.

use std::cell::OnceCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::tools::{SourceControl, ToolError};

const VERSION_DEFINE: &str = "#define CURR_VERSION ";

/// Identifiers shared by every artifact of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Monotonic pre-release counter
    pub pre_release: u64,
    /// Revision id of the built commit
    pub revision_id: String,
    /// Product version, 1-3 dot-separated integers
    pub product_version: String,
}

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("'{0}' is not a valid version number (expected 1-3 dot-separated integers)")]
    InvalidVersion(String),

    #[error("couldn't find '#define CURR_VERSION' in {}", .path.display())]
    MissingDefine { path: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("'{0}' is not a revision id")]
    InvalidRevision(String),

    #[error("source control unavailable: {0}")]
    SourceControl(#[from] ToolError),
}

/// Validate a product version string and return it unchanged.
pub fn parse_product_version(s: &str) -> Result<&str, VersionError> {
    let parts: Vec<&str> = s.split('.').collect();
    let valid = (1..=3).contains(&parts.len())
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()));
    if valid {
        Ok(s)
    } else {
        Err(VersionError::InvalidVersion(s.to_string()))
    }
}

/// Pull the product version out of the version header text.
pub fn extract_product_version(header: &str, path: &Path) -> Result<String, VersionError> {
    for line in header.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix(VERSION_DEFINE) {
            return parse_product_version(rest.trim()).map(str::to_string);
        }
    }
    Err(VersionError::MissingDefine {
        path: path.to_path_buf(),
    })
}

fn validate_revision(id: &str) -> Result<(), VersionError> {
    let id_ok = matches!(id.len(), 40 | 64) && id.bytes().all(|b| b.is_ascii_hexdigit());
    if id_ok {
        Ok(())
    } else {
        Err(VersionError::InvalidRevision(id.to_string()))
    }
}

/// Resolves [`VersionInfo`] once and hands out the same value afterwards.
pub struct VersionResolver<'a> {
    scm: &'a dyn SourceControl,
    version_header: PathBuf,
    pre_release_offset: u64,
    resolved: OnceCell<VersionInfo>,
}

impl<'a> VersionResolver<'a> {
    pub fn new(scm: &'a dyn SourceControl, version_header: PathBuf, pre_release_offset: u64) -> Self {
        Self {
            scm,
            version_header,
            pre_release_offset,
            resolved: OnceCell::new(),
        }
    }

    /// Resolve the run's versions. Reads only; repeated calls return the
    /// first result.
    pub fn resolve(&self) -> Result<VersionInfo, VersionError> {
        if let Some(info) = self.resolved.get() {
            return Ok(info.clone());
        }

        let header = fs::read_to_string(&self.version_header).map_err(|source| VersionError::Read {
            path: self.version_header.clone(),
            source,
        })?;
        let product_version = extract_product_version(&header, &self.version_header)?;

        let pre_release = self.scm.revision_count()? + self.pre_release_offset;
        let revision_id = self.scm.head_revision()?;
        validate_revision(&revision_id)?;

        let info = VersionInfo {
            pre_release,
            revision_id,
            product_version,
        };
        info!(
            pre_release = info.pre_release,
            revision = %info.revision_id,
            product_version = %info.product_version,
            "resolved versions"
        );
        Ok(self.resolved.get_or_init(|| info).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::FakeSourceControl;
    use tempfile::TempDir;

    const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

    fn header_with(version: &str) -> String {
        format!(
            "#pragma once\n#define APP_NAME \"SumatraPDF\"\n#define CURR_VERSION {}\n#define CURR_VERSION_COMMA 3,2,0\n",
            version
        )
    }

    fn write_header(dir: &TempDir, version: &str) -> PathBuf {
        let path = dir.path().join("Version.h");
        fs::write(&path, header_with(version)).unwrap();
        path
    }

    #[test]
    fn test_valid_versions_echo_unchanged() {
        for v in ["3", "3.2", "3.2.0", "10.0.12", "007"] {
            assert_eq!(parse_product_version(v).unwrap(), v);
        }
    }

    #[test]
    fn test_invalid_versions_rejected() {
        for v in ["", "3.", ".3", "3..2", "3-2", "3,2", "3.2.a", "1.2.3.4", "v3.2", " 3.2"] {
            assert!(
                matches!(parse_product_version(v), Err(VersionError::InvalidVersion(_))),
                "{:?} should be rejected",
                v
            );
        }
    }

    #[test]
    fn test_resolve_versions() {
        let dir = TempDir::new().unwrap();
        let header = write_header(&dir, "3.2.1");
        let scm = FakeSourceControl::new(11925, SHA);

        let resolver = VersionResolver::new(&scm, header, 0);
        let info = resolver.resolve().unwrap();

        assert_eq!(info.pre_release, 11925);
        assert_eq!(info.revision_id, SHA);
        assert_eq!(info.product_version, "3.2.1");
    }

    #[test]
    fn test_offset_applied() {
        let dir = TempDir::new().unwrap();
        let header = write_header(&dir, "3.2");
        let scm = FakeSourceControl::new(100, SHA);

        let info = VersionResolver::new(&scm, header, 1000).resolve().unwrap();
        assert_eq!(info.pre_release, 1100);
    }

    #[test]
    fn test_resolve_is_stable() {
        let dir = TempDir::new().unwrap();
        let header = write_header(&dir, "3.2");
        let scm = FakeSourceControl::new(100, SHA);
        let resolver = VersionResolver::new(&scm, header.clone(), 0);

        let first = resolver.resolve().unwrap();
        // later edits to the header do not change an already resolved run
        fs::write(&header, header_with("9.9")).unwrap();
        let second = resolver.resolve().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_malformed_header_version() {
        let dir = TempDir::new().unwrap();
        let header = write_header(&dir, "3.2.0.1");
        let scm = FakeSourceControl::new(100, SHA);

        let err = VersionResolver::new(&scm, header, 0).resolve().unwrap_err();
        assert!(matches!(err, VersionError::InvalidVersion(v) if v == "3.2.0.1"));
    }

    #[test]
    fn test_missing_define() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Version.h");
        fs::write(&path, "#pragma once\n").unwrap();
        let scm = FakeSourceControl::new(1, SHA);

        let err = VersionResolver::new(&scm, path, 0).resolve().unwrap_err();
        assert!(matches!(err, VersionError::MissingDefine { .. }));
    }

    #[test]
    fn test_not_a_repository() {
        let dir = TempDir::new().unwrap();
        let header = write_header(&dir, "3.2");
        let scm = FakeSourceControl::new(1, SHA).without_repository();

        let err = VersionResolver::new(&scm, header, 0).resolve().unwrap_err();
        assert!(matches!(err, VersionError::SourceControl(_)));
    }

    #[test]
    fn test_bad_revision_id() {
        let dir = TempDir::new().unwrap();
        let header = write_header(&dir, "3.2");
        let scm = FakeSourceControl::new(1, "not-a-sha");

        let err = VersionResolver::new(&scm, header, 0).resolve().unwrap_err();
        assert!(matches!(err, VersionError::InvalidRevision(_)));
    }
}
