//! Build tree layout: where outputs land and which files each stage touches.

use std::path::{Path, PathBuf};

use artifact_names::{ArtifactKind, BuildVariant};

use crate::config::PathsConfig;

/// Solution targets of a full release build.
pub const RELEASE_TARGETS: &[&str] = &[
    "SumatraPDF",
    "SumatraPDF-dll",
    "PdfFilter",
    "PdfPreview",
    "test_util",
];

/// Targets of the quick local smoke build.
pub const SMOKE_TARGETS: &[&str] = &["SumatraPDF-dll", "test_util"];

pub const LZSA_TARGET: &str = "MakeLZSA";
pub const LZSA_EXE: &str = "MakeLZSA.exe";

/// Self-test executable produced by the `test_util` target.
pub const TEST_EXE: &str = "test_util.exe";

/// Binaries that receive a trust signature.
pub const SIGNED_FILES: &[&str] = &[
    "SumatraPDF.exe",
    "libmupdf.dll",
    "PdfFilter.dll",
    "PdfPreview.dll",
    "SumatraPDF-dll.exe",
];

/// Debug symbols packed into both archive formats.
pub const PDB_FILES: &[&str] = &[
    "libmupdf.pdb",
    "Installer.pdb",
    "SumatraPDF-dll.pdb",
    "SumatraPDF.pdb",
];

/// Debug symbols of the smoke build (no installer).
pub const SMOKE_PDB_FILES: &[&str] = &["libmupdf.pdb", "SumatraPDF.pdb", "SumatraPDF-dll.pdb"];

/// Files a target must leave in the variant output directory.
pub fn target_outputs(target: &str) -> &'static [&'static str] {
    match target {
        "SumatraPDF" => &["SumatraPDF.exe"],
        "SumatraPDF-dll" => &["SumatraPDF-dll.exe", "libmupdf.dll"],
        "PdfFilter" => &["PdfFilter.dll"],
        "PdfPreview" => &["PdfPreview.dll"],
        "test_util" => &[TEST_EXE],
        "MakeLZSA" => &[LZSA_EXE],
        _ => &[],
    }
}

/// Files listed per variant in the size manifest, in manifest order.
pub const MANIFEST_FILES: &[&str] = &[
    "SumatraPDF.exe",
    "SumatraPDF-dll.exe",
    "libmupdf.dll",
    "PdfFilter.dll",
    "PdfPreview.dll",
    "SumatraPDF.pdb.zip",
    "SumatraPDF.pdb.lzsa",
];

/// Absolute locations of one checkout.
#[derive(Debug, Clone)]
pub struct BuildLayout {
    root: PathBuf,
    out_dir: PathBuf,
    artifacts_dir: PathBuf,
    solution: PathBuf,
    version_header: PathBuf,
    build_config_header: PathBuf,
}

impl BuildLayout {
    pub fn new(root: &Path, paths: &PathsConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            out_dir: root.join(&paths.out_dir),
            artifacts_dir: root.join(&paths.artifacts_dir),
            solution: root.join(&paths.solution),
            version_header: root.join(&paths.version_header),
            build_config_header: root.join(&paths.build_config_header),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    pub fn solution(&self) -> &Path {
        &self.solution
    }

    pub fn version_header(&self) -> &Path {
        &self.version_header
    }

    pub fn build_config_header(&self) -> &Path {
        &self.build_config_header
    }

    /// `out/rel32` or `out/rel64`.
    pub fn variant_dir(&self, variant: BuildVariant) -> PathBuf {
        self.out_dir.join(variant.out_dir_name())
    }

    /// `artifacts/32` or `artifacts/64`.
    pub fn artifacts_variant_dir(&self, variant: BuildVariant) -> PathBuf {
        self.artifacts_dir.join(variant.artifacts_subdir())
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.artifacts_dir.join(ArtifactKind::Manifest.local_file_name())
    }

    pub fn summary_path(&self) -> PathBuf {
        self.artifacts_dir.join("release_summary.json")
    }

    /// Path relative to the root with `/` separators.
    pub fn display_relative(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}
