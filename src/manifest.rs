//! Size manifest
//!
//! One line per produced file, `<relative path>: <size in bytes>`, joined
//! with `\n` and no trailing newline. Downstream tooling reads it as a
//! plain size audit.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use artifact_names::BuildVariant;
use thiserror::Error;

use crate::layout::BuildLayout;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("file listed in manifest is missing: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("failed to write manifest {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub path: String,
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SizeManifest {
    pub entries: Vec<ManifestEntry>,
}

impl SizeManifest {
    /// Stat `files` in every variant directory, variants in order.
    pub fn collect(
        layout: &BuildLayout,
        variants: &[BuildVariant],
        files: &[&str],
    ) -> Result<Self, ManifestError> {
        let mut entries = Vec::new();
        for &variant in variants {
            let dir = layout.variant_dir(variant);
            for file in files {
                let path = dir.join(file);
                let meta = fs::metadata(&path).map_err(|_| ManifestError::MissingFile(path.clone()))?;
                entries.push(ManifestEntry {
                    path: layout.display_relative(&path),
                    size: meta.len(),
                });
            }
        }
        Ok(Self { entries })
    }

    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{}: {}", e.path, e.size))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn write(&self, path: &Path) -> Result<(), ManifestError> {
        let write = || -> io::Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, self.render())
        };
        write().map_err(|source| ManifestError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReleaseConfig;
    use tempfile::TempDir;

    fn layout(dir: &TempDir) -> BuildLayout {
        BuildLayout::new(dir.path(), &ReleaseConfig::builtin().unwrap().paths)
    }

    #[test]
    fn test_render_format() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);
        for variant in BuildVariant::ALL {
            let vdir = layout.variant_dir(variant);
            fs::create_dir_all(&vdir).unwrap();
            fs::write(vdir.join("SumatraPDF.exe"), vec![0u8; 12]).unwrap();
            fs::write(vdir.join("PdfFilter.dll"), vec![0u8; 3]).unwrap();
        }

        let manifest = SizeManifest::collect(
            &layout,
            &BuildVariant::ALL,
            &["SumatraPDF.exe", "PdfFilter.dll"],
        )
        .unwrap();
        assert_eq!(
            manifest.render(),
            "out/rel32/SumatraPDF.exe: 12\nout/rel32/PdfFilter.dll: 3\n\
             out/rel64/SumatraPDF.exe: 12\nout/rel64/PdfFilter.dll: 3"
        );

        let path = layout.manifest_path();
        manifest.write(&path).unwrap();
        assert!(!fs::read_to_string(path).unwrap().ends_with('\n'));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = SizeManifest::collect(&layout(&dir), &[BuildVariant::X64], &["PdfPreview.dll"])
            .unwrap_err();
        assert!(matches!(err, ManifestError::MissingFile(p) if p.ends_with("PdfPreview.dll")));
    }
}
