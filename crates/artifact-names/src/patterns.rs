//! Ordered decode table.
//!
//! Decoding tries the table top to bottom and stops at the first match.
//! The order is a contract: x64 names come before the generic (Win32)
//! names, within each group the longer tails come before `.exe`, and the
//! manifest forms come last. Patterns are anchored so a canonical name is
//! matched by exactly one entry; the order still decides if a looser
//! pattern is ever added.

use regex_lite::Regex;

use crate::{ArtifactKind, BuildVariant, NameError};

/// Pattern sources in decode order.
const PATTERN_TABLE: &[(&str, ArtifactKind, Option<BuildVariant>)] = &[
    (r"^SumatraPDF-prerelease-(\d+)-64-install\.exe$", ArtifactKind::DllExe, Some(BuildVariant::X64)),
    (r"^SumatraPDF-prerelease-(\d+)-64-PdfFilter\.dll$", ArtifactKind::FilterDll, Some(BuildVariant::X64)),
    (r"^SumatraPDF-prerelease-(\d+)-64-PdfPreview\.dll$", ArtifactKind::PreviewDll, Some(BuildVariant::X64)),
    (r"^SumatraPDF-prerelease-(\d+)-64\.pdb\.lzsa$", ArtifactKind::DebugSymbolArchiveLzsa, Some(BuildVariant::X64)),
    (r"^SumatraPDF-prerelease-(\d+)-64\.pdb\.zip$", ArtifactKind::DebugSymbolArchiveZip, Some(BuildVariant::X64)),
    (r"^SumatraPDF-prerelease-(\d+)-64\.exe$", ArtifactKind::MainExe, Some(BuildVariant::X64)),
    // older runs put the x64 marker after the kind
    (r"^SumatraPDF-prerelease-(\d+)-install-64\.exe$", ArtifactKind::DllExe, Some(BuildVariant::X64)),
    (r"^SumatraPDF-prerelease-(\d+)\.pdb-64\.lzsa$", ArtifactKind::DebugSymbolArchiveLzsa, Some(BuildVariant::X64)),
    (r"^SumatraPDF-prerelease-(\d+)\.pdb-64\.zip$", ArtifactKind::DebugSymbolArchiveZip, Some(BuildVariant::X64)),
    (r"^SumatraPDF-prerelease-(\d+)-install\.exe$", ArtifactKind::DllExe, Some(BuildVariant::Win32)),
    (r"^SumatraPDF-prerelease-(\d+)-PdfFilter\.dll$", ArtifactKind::FilterDll, Some(BuildVariant::Win32)),
    (r"^SumatraPDF-prerelease-(\d+)-PdfPreview\.dll$", ArtifactKind::PreviewDll, Some(BuildVariant::Win32)),
    (r"^SumatraPDF-prerelease-(\d+)\.pdb\.lzsa$", ArtifactKind::DebugSymbolArchiveLzsa, Some(BuildVariant::Win32)),
    (r"^SumatraPDF-prerelease-(\d+)\.pdb\.zip$", ArtifactKind::DebugSymbolArchiveZip, Some(BuildVariant::Win32)),
    (r"^SumatraPDF-prerelease-(\d+)\.exe$", ArtifactKind::MainExe, Some(BuildVariant::Win32)),
    (r"^SumatraPDF-prerelease-(\d+)-manifest\.txt$", ArtifactKind::Manifest, None),
    // older runs wrote the manifest under this name
    (r"^manifest-(\d+)\.txt$", ArtifactKind::Manifest, None),
];

/// One compiled entry of the decode table.
#[derive(Debug, Clone)]
pub struct NamePattern {
    regex: Regex,
    kind: ArtifactKind,
    variant: Option<BuildVariant>,
}

impl NamePattern {
    /// Source text of the pattern.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn variant(&self) -> Option<BuildVariant> {
        self.variant
    }

    /// Captured version if `name` matches this pattern.
    fn capture_version(&self, name: &str) -> Option<u64> {
        let caps = self.regex.captures(name)?;
        caps.get(1)?.as_str().parse().ok()
    }
}

/// Result of decoding a remote file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedName {
    pub kind: ArtifactKind,
    /// Variant implied by the name; `None` for kinds that do not encode it.
    pub variant: Option<BuildVariant>,
    /// Pre-release counter embedded in the name.
    pub version: u64,
}

/// Compiled decode table.
#[derive(Debug, Clone)]
pub struct ArtifactNameCodec {
    patterns: Vec<NamePattern>,
}

impl ArtifactNameCodec {
    /// Compile the pattern table.
    pub fn new() -> Result<Self, NameError> {
        let patterns = PATTERN_TABLE
            .iter()
            .map(|(source, kind, variant)| {
                let regex = Regex::new(source).map_err(|e| NameError::Pattern {
                    pattern: source.to_string(),
                    message: e.to_string(),
                })?;
                Ok(NamePattern {
                    regex,
                    kind: *kind,
                    variant: *variant,
                })
            })
            .collect::<Result<Vec<_>, NameError>>()?;
        Ok(Self { patterns })
    }

    /// Patterns in decode order.
    pub fn patterns(&self) -> &[NamePattern] {
        &self.patterns
    }

    /// Decode a bare file name (no store prefix). Returns the first match
    /// in table order, or `None` if nothing matches or the captured
    /// version does not fit in a `u64`.
    pub fn decode(&self, name: &str) -> Option<DecodedName> {
        self.patterns.iter().find_map(|p| {
            p.capture_version(name).map(|version| DecodedName {
                kind: p.kind,
                variant: p.variant,
                version,
            })
        })
    }

    /// Every pattern that matches `name`, in table order.
    pub fn matching_patterns(&self, name: &str) -> Vec<&NamePattern> {
        self.patterns
            .iter()
            .filter(|p| p.regex.is_match(name))
            .collect()
    }

    /// Whether `name` decodes to a manifest.
    pub fn is_manifest(&self, name: &str) -> bool {
        matches!(
            self.decode(name),
            Some(DecodedName {
                kind: ArtifactKind::Manifest,
                ..
            })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode;

    fn codec() -> ArtifactNameCodec {
        ArtifactNameCodec::new().unwrap()
    }

    #[test]
    fn test_decode_recovers_kind_and_version() {
        let codec = codec();
        for kind in ArtifactKind::ALL {
            for variant in BuildVariant::ALL {
                let name = encode(kind, 10169, variant);
                let decoded = codec.decode(&name).unwrap_or_else(|| panic!("{} not decoded", name));
                assert_eq!(decoded.kind, kind, "{}", name);
                assert_eq!(decoded.version, 10169, "{}", name);
                if kind.is_per_variant() {
                    assert_eq!(decoded.variant, Some(variant), "{}", name);
                } else {
                    assert_eq!(decoded.variant, None, "{}", name);
                }
            }
        }
    }

    #[test]
    fn test_no_two_patterns_match_a_canonical_name() {
        let codec = codec();
        for kind in ArtifactKind::ALL {
            for variant in BuildVariant::ALL {
                let name = encode(kind, 42, variant);
                let matches = codec.matching_patterns(&name);
                assert_eq!(
                    matches.len(),
                    1,
                    "{} matched {:?}",
                    name,
                    matches.iter().map(|p| p.as_str()).collect::<Vec<_>>()
                );
            }
        }
    }

    #[test]
    fn test_x64_patterns_precede_generic() {
        let codec = codec();
        let patterns = codec.patterns();
        let last_x64 = patterns
            .iter()
            .rposition(|p| p.variant() == Some(BuildVariant::X64))
            .unwrap();
        let first_generic = patterns
            .iter()
            .position(|p| p.variant() == Some(BuildVariant::Win32))
            .unwrap();
        let first_manifest = patterns
            .iter()
            .position(|p| p.kind() == ArtifactKind::Manifest)
            .unwrap();
        assert!(last_x64 < first_generic);
        assert!(first_generic < first_manifest);
        assert!(patterns[first_manifest..]
            .iter()
            .all(|p| p.kind() == ArtifactKind::Manifest));
    }

    const LEGACY_X64: &[(&str, ArtifactKind)] = &[
        ("SumatraPDF-prerelease-10169-install-64.exe", ArtifactKind::DllExe),
        ("SumatraPDF-prerelease-10169.pdb-64.lzsa", ArtifactKind::DebugSymbolArchiveLzsa),
        ("SumatraPDF-prerelease-10169.pdb-64.zip", ArtifactKind::DebugSymbolArchiveZip),
    ];

    #[test]
    fn test_decode_legacy_x64_names() {
        let codec = codec();
        for &(name, kind) in LEGACY_X64 {
            let decoded = codec.decode(name).unwrap_or_else(|| panic!("{} not decoded", name));
            assert_eq!(decoded.kind, kind, "{}", name);
            assert_eq!(decoded.variant, Some(BuildVariant::X64), "{}", name);
            assert_eq!(decoded.version, 10169, "{}", name);
            // re-encoding yields the current name of the same artifact
            let current = encode(kind, decoded.version, BuildVariant::X64);
            assert_eq!(codec.decode(&current), Some(decoded), "{}", current);
        }
    }

    #[test]
    fn test_legacy_x64_names_match_one_pattern() {
        let codec = codec();
        for &(name, _) in LEGACY_X64 {
            assert_eq!(codec.matching_patterns(name).len(), 1, "{}", name);
        }
    }

    #[test]
    fn test_decode_legacy_manifest() {
        let decoded = codec().decode("manifest-10169.txt").unwrap();
        assert_eq!(decoded.kind, ArtifactKind::Manifest);
        assert_eq!(decoded.version, 10169);
    }

    #[test]
    fn test_decode_rejects_unknown_names() {
        let codec = codec();
        assert!(codec.decode("SumatraPDF-3.2.exe").is_none());
        assert!(codec.decode("SumatraPDF-prerelease-abc.exe").is_none());
        assert!(codec.decode("SumatraPDF-prerelease-12.exe.bak").is_none());
        assert!(codec.decode("prefix/SumatraPDF-prerelease-12.exe").is_none());
        assert!(codec.decode("SumatraPDF-prerelease-99999999999999999999999.exe").is_none());
    }

    #[test]
    fn test_is_manifest() {
        let codec = codec();
        assert!(codec.is_manifest("SumatraPDF-prerelease-5-manifest.txt"));
        assert!(codec.is_manifest("manifest-5.txt"));
        assert!(!codec.is_manifest("SumatraPDF-prerelease-5.exe"));
    }
}
