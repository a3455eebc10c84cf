//! Artifact version registry
//!
//! Groups remote keys by the pre-release version embedded in their names,
//! newest first, and answers whether a version has been published. The
//! manifest object of a version is the only "already published" signal.

mod retention;

pub use retention::{apply_prune, DeleteOp, PruneReport, RetentionPolicy};

use std::collections::BTreeMap;

use artifact_names::{manifest_name, ArtifactKind, ArtifactNameCodec, BuildVariant};
use serde::Serialize;
use tracing::{debug, warn};

use crate::store::{ObjectStore, StoreError};

/// One remote object belonging to a version group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupEntry {
    /// Base name
    pub name: String,
    /// Full remote key
    pub path: String,
    pub kind: ArtifactKind,
    pub variant: Option<BuildVariant>,
}

impl GroupEntry {
    pub fn is_manifest(&self) -> bool {
        self.kind == ArtifactKind::Manifest
    }
}

/// All remote objects of one pre-release version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionGroup {
    pub version: u64,
    pub version_str: String,
    /// Entries in listing order
    pub entries: Vec<GroupEntry>,
}

impl VersionGroup {
    fn new(version: u64) -> Self {
        Self {
            version,
            version_str: version.to_string(),
            entries: Vec::new(),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.path.as_str())
    }

    pub fn has_manifest(&self) -> bool {
        self.entries.iter().any(GroupEntry::is_manifest)
    }
}

/// Grouped view of a remote listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VersionListing {
    /// Sorted by version, newest first
    pub groups: Vec<VersionGroup>,
    /// Keys no pattern recognized
    pub unrecognized: Vec<String>,
}

impl VersionListing {
    pub fn group(&self, version: u64) -> Option<&VersionGroup> {
        self.groups.iter().find(|g| g.version == version)
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Group remote keys by version. Unrecognized keys are collected, never
/// fatal.
pub fn list_versions<'a, I>(codec: &ArtifactNameCodec, paths: I) -> VersionListing
where
    I: IntoIterator<Item = &'a str>,
{
    let mut by_version: BTreeMap<u64, VersionGroup> = BTreeMap::new();
    let mut unrecognized = Vec::new();

    for path in paths {
        let name = base_name(path);
        match codec.decode(name) {
            Some(decoded) => {
                by_version
                    .entry(decoded.version)
                    .or_insert_with(|| VersionGroup::new(decoded.version))
                    .entries
                    .push(GroupEntry {
                        name: name.to_string(),
                        path: path.to_string(),
                        kind: decoded.kind,
                        variant: decoded.variant,
                    });
            }
            None => unrecognized.push(path.to_string()),
        }
    }

    VersionListing {
        groups: by_version.into_values().rev().collect(),
        unrecognized,
    }
}

/// Remote view of published versions under one key prefix.
#[derive(Debug, Clone)]
pub struct ArtifactRegistry {
    codec: ArtifactNameCodec,
    prefix: String,
    max_list_results: usize,
}

impl ArtifactRegistry {
    pub fn new(codec: ArtifactNameCodec, prefix: impl Into<String>, max_list_results: usize) -> Self {
        Self {
            codec,
            prefix: prefix.into(),
            max_list_results,
        }
    }

    pub fn codec(&self) -> &ArtifactNameCodec {
        &self.codec
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Full remote key for a file name.
    pub fn key_for(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    pub fn manifest_key(&self, version: u64) -> String {
        self.key_for(&manifest_name(version))
    }

    /// List and group the store's objects under the prefix.
    ///
    /// A listing that does not fit into one page is an error, there is
    /// no pagination.
    pub fn fetch_listing(&self, store: &dyn ObjectStore) -> Result<VersionListing, StoreError> {
        let listing = store.list(&self.prefix, self.max_list_results)?;
        if listing.truncated {
            return Err(StoreError::Truncated {
                prefix: self.prefix.clone(),
                limit: self.max_list_results,
            });
        }
        let grouped = list_versions(&self.codec, listing.objects.iter().map(|o| o.key.as_str()));
        for key in &grouped.unrecognized {
            warn!(store = store.name(), "unrecognized remote file {}", key);
        }
        debug!(
            store = store.name(),
            groups = grouped.groups.len(),
            "fetched version listing"
        );
        Ok(grouped)
    }

    /// Whether the manifest of `version` exists in `store`.
    pub fn is_version_published(&self, store: &dyn ObjectStore, version: u64) -> Result<bool, StoreError> {
        store.exists(&self.manifest_key(version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artifact_names::encode;

    fn codec() -> ArtifactNameCodec {
        ArtifactNameCodec::new().unwrap()
    }

    #[test]
    fn test_groups_sorted_descending() {
        let keys = vec![
            format!("p/{}", encode(ArtifactKind::MainExe, 9, BuildVariant::Win32)),
            format!("p/{}", encode(ArtifactKind::MainExe, 10, BuildVariant::Win32)),
            format!("p/{}", encode(ArtifactKind::DllExe, 9, BuildVariant::X64)),
        ];
        let listing = list_versions(&codec(), keys.iter().map(String::as_str));
        let versions: Vec<u64> = listing.groups.iter().map(|g| g.version).collect();
        // numeric, not lexicographic
        assert_eq!(versions, vec![10, 9]);
        assert_eq!(listing.groups[1].entries.len(), 2);
        assert_eq!(listing.groups[1].entries[1].variant, Some(BuildVariant::X64));
    }

    #[test]
    fn test_group_keeps_full_paths() {
        let key = format!("sumatrapdf/prerel/{}", manifest_name(5));
        let listing = list_versions(&codec(), [key.as_str()]);
        let group = listing.group(5).unwrap();
        assert_eq!(group.paths().collect::<Vec<_>>(), vec![key.as_str()]);
        assert_eq!(group.names().collect::<Vec<_>>(), vec![manifest_name(5).as_str()]);
        assert!(group.has_manifest());
        assert_eq!(group.version_str, "5");
    }

    #[test]
    fn test_unrecognized_collected() {
        let listing = list_versions(&codec(), ["p/readme.txt", "p/SumatraPDF-3.2.exe"]);
        assert!(listing.groups.is_empty());
        assert_eq!(listing.unrecognized, vec!["p/readme.txt", "p/SumatraPDF-3.2.exe"]);
    }

    #[test]
    fn test_manifest_key() {
        let registry = ArtifactRegistry::new(codec(), "sumatrapdf/prerel/", 1000);
        assert_eq!(
            registry.manifest_key(200),
            "sumatrapdf/prerel/SumatraPDF-prerelease-200-manifest.txt"
        );
    }
}
