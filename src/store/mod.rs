//! Remote object stores
//!
//! Published artifacts live in one or more S3-compatible buckets. The
//! pipeline only needs flat listing under a prefix, existence checks,
//! uploads and deletes, so that is all [`ObjectStore`]
//! offers.

mod aws_cli;
mod dir;

pub use aws_cli::AwsCliStore;
pub use dir::DirStore;

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tools::ToolError;

/// Store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store command failed: {0}")]
    Command(#[from] ToolError),

    #[error("unexpected store response: {0}")]
    Protocol(String),

    #[error("listing of '{prefix}' exceeds {limit} entries")]
    Truncated { prefix: String, limit: usize },

    #[error("store I/O error: {0}")]
    Io(#[from] io::Error),
}

/// One listed object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreObject {
    /// Full key including the prefix
    pub key: String,
    pub size: u64,
}

/// Result of a single list request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub objects: Vec<StoreObject>,
    /// More objects exist beyond the requested page size.
    pub truncated: bool,
}

/// A flat key/value object store.
pub trait ObjectStore {
    /// Short name used in logs and the run summary.
    fn name(&self) -> &str;

    /// List keys under `prefix`, at most `max_results` of them.
    fn list(&self, prefix: &str, max_results: usize) -> Result<Listing, StoreError>;

    fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Upload a local file under `key`, publicly readable.
    fn upload(&self, key: &str, source: &Path) -> Result<(), StoreError>;

    /// Upload in-memory text under `key`, publicly readable.
    fn upload_string(&self, key: &str, content: &str) -> Result<(), StoreError>;

    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn list(&self, prefix: &str, max_results: usize) -> Result<Listing, StoreError> {
        (**self).list(prefix, max_results)
    }

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        (**self).exists(key)
    }

    fn upload(&self, key: &str, source: &Path) -> Result<(), StoreError> {
        (**self).upload(key, source)
    }

    fn upload_string(&self, key: &str, content: &str) -> Result<(), StoreError> {
        (**self).upload_string(key, content)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key)
    }
}
