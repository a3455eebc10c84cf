//! S3-compatible store driven through `aws s3api`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;
use tracing::{debug, warn};

use super::{Listing, ObjectStore, StoreError, StoreObject};
use crate::config::{ConfigError, Environment, StoreConfig};
use crate::tools::{capture, ToolError};

/// Bucket accessed with the AWS CLI.
#[derive(Debug, Clone)]
pub struct AwsCliStore {
    name: String,
    program: PathBuf,
    bucket: String,
    endpoint: Option<String>,
    access_key: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(rename = "Contents", default)]
    contents: Vec<ListEntry>,
    #[serde(rename = "NextToken", default)]
    next_token: Option<String>,
    #[serde(rename = "IsTruncated", default)]
    is_truncated: bool,
}

#[derive(Debug, Deserialize)]
struct ListEntry {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "Size", default)]
    size: u64,
}

impl AwsCliStore {
    /// Build from config, reading the credentials it names.
    pub fn from_config(
        config: &StoreConfig,
        program: &Path,
        env: &Environment,
    ) -> Result<Self, ConfigError> {
        let missing: Vec<String> = [&config.access_key_env, &config.secret_key_env]
            .into_iter()
            .filter(|var| !env.has(var))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingCredentials {
                store: config.name.clone(),
                variables: missing,
            });
        }
        Ok(Self {
            name: config.name.clone(),
            program: program.to_path_buf(),
            bucket: config.bucket.clone(),
            endpoint: config.endpoint.clone(),
            access_key: env.get(&config.access_key_env).unwrap_or_default().to_string(),
            secret_key: env.get(&config.secret_key_env).unwrap_or_default().to_string(),
        })
    }

    fn s3api(&self, operation: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.env("AWS_ACCESS_KEY_ID", &self.access_key)
            .env("AWS_SECRET_ACCESS_KEY", &self.secret_key)
            .arg("s3api")
            .arg(operation)
            .args(["--bucket", &self.bucket]);
        if let Some(endpoint) = &self.endpoint {
            cmd.args(["--endpoint-url", endpoint]);
        }
        cmd
    }
}

fn parse_listing(json: &str) -> Result<Listing, StoreError> {
    if json.trim().is_empty() {
        return Ok(Listing::default());
    }
    let resp: ListResponse =
        serde_json::from_str(json).map_err(|e| StoreError::Protocol(e.to_string()))?;
    Ok(Listing {
        objects: resp
            .contents
            .into_iter()
            .map(|e| StoreObject {
                key: e.key,
                size: e.size,
            })
            .collect(),
        truncated: resp.is_truncated || resp.next_token.is_some(),
    })
}

fn is_not_found(err: &ToolError) -> bool {
    match err {
        ToolError::ExitStatus { detail, .. } => {
            detail.contains("404") || detail.contains("Not Found")
        }
        _ => false,
    }
}

impl ObjectStore for AwsCliStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn list(&self, prefix: &str, max_results: usize) -> Result<Listing, StoreError> {
        let out = capture(
            self.s3api("list-objects-v2")
                .args(["--prefix", prefix])
                .args(["--max-items", &max_results.to_string()])
                .args(["--output", "json"]),
        )?;
        let listing = parse_listing(&out)?;
        debug!(store = %self.name, prefix, count = listing.objects.len(), "listed objects");
        Ok(listing)
    }

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        match capture(self.s3api("head-object").args(["--key", key])) {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn upload(&self, key: &str, source: &Path) -> Result<(), StoreError> {
        capture(
            self.s3api("put-object")
                .args(["--key", key])
                .arg("--body")
                .arg(source)
                .args(["--acl", "public-read"]),
        )?;
        Ok(())
    }

    fn upload_string(&self, key: &str, content: &str) -> Result<(), StoreError> {
        // put-object only takes a file body
        let staged = std::env::temp_dir().join(format!("sumatra-release-{}", ulid::Ulid::new()));
        fs::write(&staged, content)?;
        let result = self.upload(key, &staged);
        if let Err(e) = fs::remove_file(&staged) {
            warn!("failed to remove {}: {}", staged.display(), e);
        }
        result
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        capture(self.s3api("delete-object").args(["--key", key]))?;
        Ok(())
    }
}
