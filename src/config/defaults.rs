//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};

/// Repo config location relative to the repository root.
pub const REPO_CONFIG_PATH: &str = ".release/config.toml";

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Build output root (default: "out")
    pub out_dir: String,

    /// CI artifacts directory (default: "artifacts")
    pub artifacts_dir: String,

    /// Solution handed to msbuild
    pub solution: String,

    /// Header carrying `#define CURR_VERSION`
    pub version_header: String,

    /// Header overwritten with commit metadata during release builds
    pub build_config_header: String,

    /// Version groups kept by pruning (default: 10)
    pub retain: usize,

    /// Remote listing page size (default: 1000)
    pub max_list_results: usize,

    /// Key prefix of pre-release files
    pub remote_prefix: String,

    /// Branch that may publish (default: "master")
    pub release_branch: String,

    /// Repository that may publish from CI
    pub canonical_repository: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            out_dir: "out".to_string(),
            artifacts_dir: "artifacts".to_string(),
            solution: "vs2019/SumatraPDF.sln".to_string(),
            version_header: "src/Version.h".to_string(),
            build_config_header: "src/utils/BuildConfig.h".to_string(),
            retain: 10,
            max_list_results: 1000,
            remote_prefix: "sumatrapdf/prerel/".to_string(),
            release_branch: "master".to_string(),
            canonical_repository: "sumatrapdfreader/sumatrapdf".to_string(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "paths": {
                "out_dir": self.out_dir,
                "artifacts_dir": self.artifacts_dir,
                "solution": self.solution,
                "version_header": self.version_header,
                "build_config_header": self.build_config_header
            },
            "tools": {
                "msbuild": "msbuild.exe",
                "lzsa": "bin/MakeLZSA.exe",
                "clang_format": "clang-format",
                "aws": "aws",
                "strings_check": ["go", "run", "./do", "-trans-regen"]
            },
            "version": {
                "pre_release_offset": 0
            },
            "publish": {
                "remote_prefix": self.remote_prefix,
                "info_prefix": "sumatrapdf/",
                "public_base_url": "https://kjkpub.s3.amazonaws.com/",
                "retain": self.retain,
                "max_list_results": self.max_list_results,
                "release_branch": self.release_branch,
                "canonical_repository": self.canonical_repository
            },
            "sign": {
                "tool": "bin/signtool.exe",
                "args": [
                    "sign", "/t", "http://timestamp.digicert.com",
                    "/du", "https://www.sumatrapdfreader.org",
                    "/fd", "sha256", "/a"
                ],
                "credential_env": null
            },
            "source": {
                "format_globs": ["src/**/*.cpp", "src/**/*.h"],
                "line_count_globs": ["src/**/*.cpp", "src/**/*.h", "do/**/*.go"],
                "exclude_globs": ["ext/**", "mupdf/**"]
            },
            "stores": [
                {
                    "name": "s3",
                    "bucket": "kjkpub",
                    "endpoint": null,
                    "access_key_env": "AWS_ACCESS",
                    "secret_key_env": "AWS_SECRET"
                },
                {
                    "name": "spaces",
                    "bucket": "kjkpub",
                    "endpoint": "https://sfo2.digitaloceanspaces.com",
                    "access_key_env": "SPACES_KEY",
                    "secret_key_env": "SPACES_SECRET"
                }
            ]
        })
    }
}
