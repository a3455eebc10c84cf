//! Process environment snapshot
//!
//! The environment is read once per run and passed around explicitly so
//! tests can supply their own variables.

use std::collections::BTreeMap;

/// Snapshot of environment variables.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Capture the current process environment.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Build from explicit pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Set and non-empty.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).map(|v| !v.is_empty()).unwrap_or(false)
    }

    pub fn ci_context(&self) -> CiContext {
        CiContext {
            repository: self.get("GITHUB_REPOSITORY").map(str::to_string),
            event_name: self.get("GITHUB_EVENT_NAME").map(str::to_string),
            git_ref: self.get("GITHUB_REF").map(str::to_string),
        }
    }
}

/// GitHub Actions context used by the publish-safety gate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CiContext {
    pub repository: Option<String>,
    pub event_name: Option<String>,
    pub git_ref: Option<String>,
}

impl CiContext {
    /// Whether this run is on `refs/heads/<branch>`.
    pub fn is_on_branch(&self, branch: &str) -> bool {
        self.git_ref.as_deref() == Some(format!("refs/heads/{}", branch).as_str())
    }

    /// Only push events on the canonical repository may publish.
    pub fn is_canonical_push(&self, canonical_repository: &str) -> bool {
        self.repository.as_deref() == Some(canonical_repository)
            && self.event_name.as_deref() == Some("push")
    }
}
