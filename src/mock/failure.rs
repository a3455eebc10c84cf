//! Failure injection for the in-memory store.

use std::collections::HashMap;

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    List,
    Exists,
    Upload,
    Delete,
}

/// How an operation should fail.
#[derive(Debug, Clone)]
pub struct FailureConfig {
    /// Message carried by the returned error
    pub message: String,
    /// Only fail calls for this key (None = every key)
    pub key: Option<String>,
    /// Number of times to fail before succeeding (None = always fail)
    pub fail_count: Option<u32>,
}

impl FailureConfig {
    /// Fail every call
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            key: None,
            fail_count: None,
        }
    }

    /// Fail only calls touching `key`
    pub fn for_key(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("injected failure for {}", key),
            key: Some(key),
            fail_count: None,
        }
    }

    /// Set the number of times to fail before succeeding
    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }

    fn applies_to(&self, key: &str) -> bool {
        self.key.as_deref().map(|k| k == key).unwrap_or(true)
    }
}

/// Per-operation failure table
#[derive(Debug, Default)]
pub struct FailureInjector {
    configs: HashMap<StoreOp, FailureConfig>,
    call_counts: HashMap<StoreOp, u32>,
}

impl FailureInjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject(&mut self, op: StoreOp, config: FailureConfig) {
        self.configs.insert(op, config);
        self.call_counts.insert(op, 0);
    }

    pub fn clear(&mut self) {
        self.configs.clear();
        self.call_counts.clear();
    }

    /// Error message if this call should fail.
    pub fn check(&mut self, op: StoreOp, key: &str) -> Option<String> {
        let config = self.configs.get(&op)?;
        if !config.applies_to(key) {
            return None;
        }
        let count = self.call_counts.entry(op).or_insert(0);
        *count += 1;
        if let Some(limit) = config.fail_count {
            if *count > limit {
                return None;
            }
        }
        Some(config.message.clone())
    }
}
