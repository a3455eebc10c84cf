//! Canonical remote names for SumatraPDF pre-release artifacts.
//!
//! Every file a release run publishes gets a deterministic name derived
//! from its logical role ([`ArtifactKind`]), the pre-release counter and
//! the platform [`BuildVariant`]. [`ArtifactNameCodec::decode`] maps a
//! name found in the remote store back to its kind and version by trying
//! an ordered pattern table, first match wins.

mod kind;
mod patterns;
mod variant;

pub use kind::ArtifactKind;
pub use patterns::{ArtifactNameCodec, DecodedName, NamePattern};
pub use variant::{BuildVariant, ParseVariantError};

/// Prefix shared by every versioned pre-release file name.
pub const PRE_RELEASE_PREFIX: &str = "SumatraPDF-prerelease-";

/// Errors building the codec.
#[derive(Debug, thiserror::Error)]
pub enum NameError {
    #[error("invalid name pattern {pattern}: {message}")]
    Pattern { pattern: String, message: String },
}

/// Build the canonical remote file name for one artifact.
///
/// Per-variant kinds carry the variant suffix (`-64` for x64) directly
/// after the version; the manifest ignores `variant` entirely.
pub fn encode(kind: ArtifactKind, pre_release: u64, variant: BuildVariant) -> String {
    let suffix = if kind.is_per_variant() {
        variant.name_suffix()
    } else {
        ""
    };
    format!("{}{}{}{}", PRE_RELEASE_PREFIX, pre_release, suffix, kind.remote_tail())
}

/// Remote name of the per-version manifest.
pub fn manifest_name(pre_release: u64) -> String {
    encode(ArtifactKind::Manifest, pre_release, BuildVariant::Win32)
}
