//! Layered release configuration
//!
//! Configuration is merged in three layers, later layers winning:
//! 1. Built-in defaults
//! 2. Repo config (`.release/config.toml`)
//! 3. CLI flags
//!
//! The merged value is then deserialized into a typed [`ReleaseConfig`].

mod defaults;
mod effective;
mod env;
mod merge;

pub use defaults::{BuiltinDefaults, REPO_CONFIG_PATH};
pub use effective::{ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig};
pub use env::{CiContext, Environment};
pub use merge::{deep_merge, merge_layers};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Typed view of the merged configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseConfig {
    pub paths: PathsConfig,
    pub tools: ToolsConfig,
    pub version: VersionConfig,
    pub publish: PublishConfig,
    pub sign: SignConfig,
    pub source: SourceConfig,
    pub stores: Vec<StoreConfig>,
}

/// Locations relative to the repository root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub out_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    pub solution: PathBuf,
    pub version_header: PathBuf,
    pub build_config_header: PathBuf,
}

/// External tool locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    pub msbuild: PathBuf,
    pub lzsa: PathBuf,
    pub clang_format: PathBuf,
    pub aws: PathBuf,
    /// Command that regenerates the translation sources. Release builds
    /// refuse to run when it is empty.
    #[serde(default)]
    pub strings_check: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionConfig {
    /// Added to the commit count to form the pre-release counter.
    pub pre_release_offset: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Key prefix of versioned pre-release files.
    pub remote_prefix: String,
    /// Key prefix of the daily-build info files.
    pub info_prefix: String,
    /// Public URL the store serves `remote_prefix` under.
    pub public_base_url: String,
    /// Number of newest version groups kept by pruning.
    pub retain: usize,
    /// Page size for remote listings.
    pub max_list_results: usize,
    pub release_branch: String,
    pub canonical_repository: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignConfig {
    /// Path to the signing tool; signing is skipped when it does not exist.
    pub tool: PathBuf,
    /// Arguments placed before the file path.
    pub args: Vec<String>,
    /// Environment variable that must be set for signing to run.
    #[serde(default)]
    pub credential_env: Option<String>,
}

/// Globs for the `format` and `wc` commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub format_globs: Vec<String>,
    pub line_count_globs: Vec<String>,
    pub exclude_globs: Vec<String>,
}

/// One remote object store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub name: String,
    pub bucket: String,
    /// Endpoint for S3-compatible services other than AWS.
    #[serde(default)]
    pub endpoint: Option<String>,
    pub access_key_env: String,
    pub secret_key_env: String,
}

impl ReleaseConfig {
    /// Deserialize the typed config from an effective config.
    pub fn from_effective(effective: &EffectiveConfig) -> Result<Self, ConfigError> {
        let config: ReleaseConfig = serde_json::from_value(effective.config.clone())
            .map_err(|e| ConfigError::ValidationError(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Built-in defaults only.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_effective(&EffectiveConfig::build(None, None)?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.publish.retain == 0 {
            return Err(ConfigError::ValidationError(
                "publish.retain must be at least 1".to_string(),
            ));
        }
        if self.publish.max_list_results == 0 {
            return Err(ConfigError::ValidationError(
                "publish.max_list_results must be at least 1".to_string(),
            ));
        }
        if !self.publish.remote_prefix.is_empty() && !self.publish.remote_prefix.ends_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "publish.remote_prefix must end with '/': {}",
                self.publish.remote_prefix
            )));
        }
        let mut names: Vec<&str> = self.stores.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        if names.len() != self.stores.len() {
            return Err(ConfigError::ValidationError(
                "store names must be unique".to_string(),
            ));
        }
        Ok(())
    }
}
