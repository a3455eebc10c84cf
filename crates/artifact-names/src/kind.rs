//! Logical artifact roles.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical role of a produced file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Portable main executable
    MainExe,
    /// Installer built from the dll configuration
    DllExe,
    /// Search filter shell extension
    FilterDll,
    /// Thumbnail/preview shell extension
    PreviewDll,
    /// Debug symbols packed as zip
    DebugSymbolArchiveZip,
    /// Debug symbols packed as lzsa
    DebugSymbolArchiveLzsa,
    /// Per-version size manifest
    Manifest,
}

impl ArtifactKind {
    /// Every kind, in upload order (manifest last).
    pub const ALL: [ArtifactKind; 7] = [
        ArtifactKind::MainExe,
        ArtifactKind::DllExe,
        ArtifactKind::FilterDll,
        ArtifactKind::PreviewDll,
        ArtifactKind::DebugSymbolArchiveZip,
        ArtifactKind::DebugSymbolArchiveLzsa,
        ArtifactKind::Manifest,
    ];

    /// File name inside the variant output directory (or the artifacts
    /// directory for the manifest).
    pub fn local_file_name(&self) -> &'static str {
        match self {
            ArtifactKind::MainExe => "SumatraPDF.exe",
            ArtifactKind::DllExe => "SumatraPDF-dll.exe",
            ArtifactKind::FilterDll => "PdfFilter.dll",
            ArtifactKind::PreviewDll => "PdfPreview.dll",
            ArtifactKind::DebugSymbolArchiveZip => "SumatraPDF.pdb.zip",
            ArtifactKind::DebugSymbolArchiveLzsa => "SumatraPDF.pdb.lzsa",
            ArtifactKind::Manifest => "manifest.txt",
        }
    }

    /// Whether the remote name encodes the build variant.
    pub fn is_per_variant(&self) -> bool {
        !matches!(self, ArtifactKind::Manifest)
    }

    /// Whether the per-variant publish set includes this kind. The shell
    /// extensions ship inside the installer and are only size-audited.
    pub fn is_uploaded(&self) -> bool {
        matches!(
            self,
            ArtifactKind::MainExe
                | ArtifactKind::DllExe
                | ArtifactKind::DebugSymbolArchiveZip
                | ArtifactKind::DebugSymbolArchiveLzsa
        )
    }

    /// Kinds uploaded once per variant, in upload order.
    pub fn uploaded_per_variant() -> impl Iterator<Item = ArtifactKind> {
        Self::ALL
            .into_iter()
            .filter(|k| k.is_per_variant() && k.is_uploaded())
    }

    /// Name tail following `<prefix><version><variant suffix>`.
    pub(crate) fn remote_tail(&self) -> &'static str {
        match self {
            ArtifactKind::MainExe => ".exe",
            ArtifactKind::DllExe => "-install.exe",
            ArtifactKind::FilterDll => "-PdfFilter.dll",
            ArtifactKind::PreviewDll => "-PdfPreview.dll",
            ArtifactKind::DebugSymbolArchiveZip => ".pdb.zip",
            ArtifactKind::DebugSymbolArchiveLzsa => ".pdb.lzsa",
            ArtifactKind::Manifest => "-manifest.txt",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.local_file_name())
    }
}
