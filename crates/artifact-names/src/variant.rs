//! Platform build variants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A target platform axis. Each variant builds into its own output
/// directory and publishes an independently named artifact set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildVariant {
    /// 32-bit build
    Win32,
    /// 64-bit build
    X64,
}

impl BuildVariant {
    /// All variants in build order.
    pub const ALL: [BuildVariant; 2] = [BuildVariant::Win32, BuildVariant::X64];

    /// Platform flag handed to the toolchain.
    pub fn platform(&self) -> &'static str {
        match self {
            BuildVariant::Win32 => "Win32",
            BuildVariant::X64 => "x64",
        }
    }

    /// Output directory name under the build root (`out/<dir>`).
    pub fn out_dir_name(&self) -> &'static str {
        match self {
            BuildVariant::Win32 => "rel32",
            BuildVariant::X64 => "rel64",
        }
    }

    /// Sub-directory under the CI artifacts directory.
    pub fn artifacts_subdir(&self) -> &'static str {
        match self {
            BuildVariant::Win32 => "32",
            BuildVariant::X64 => "64",
        }
    }

    /// Marker inserted after the version in remote names.
    pub fn name_suffix(&self) -> &'static str {
        match self {
            BuildVariant::Win32 => "",
            BuildVariant::X64 => "-64",
        }
    }
}

impl fmt::Display for BuildVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BuildVariant::Win32 => "win32",
            BuildVariant::X64 => "x64",
        })
    }
}

/// Unknown variant name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown build variant '{0}' (expected win32 or x64)")]
pub struct ParseVariantError(pub String);

impl FromStr for BuildVariant {
    type Err = ParseVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "win32" | "32" | "x86" => Ok(BuildVariant::Win32),
            "x64" | "64" | "amd64" => Ok(BuildVariant::X64),
            _ => Err(ParseVariantError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_dirs_are_distinct() {
        assert_ne!(BuildVariant::Win32.out_dir_name(), BuildVariant::X64.out_dir_name());
        assert_ne!(BuildVariant::Win32.artifacts_subdir(), BuildVariant::X64.artifacts_subdir());
    }

    #[test]
    fn test_variant_parse() {
        assert_eq!("x64".parse::<BuildVariant>().unwrap(), BuildVariant::X64);
        assert_eq!("Win32".parse::<BuildVariant>().unwrap(), BuildVariant::Win32);
        assert!("arm64".parse::<BuildVariant>().is_err());
    }
}
