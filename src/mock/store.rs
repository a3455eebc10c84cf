//! In-memory object store.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::failure::{FailureConfig, FailureInjector, StoreOp};
use crate::store::{Listing, ObjectStore, StoreError, StoreObject};

#[derive(Debug, Default)]
struct Inner {
    objects: BTreeMap<String, Vec<u8>>,
    failures: FailureInjector,
    uploads: Vec<String>,
    deletes: Vec<String>,
}

/// [`ObjectStore`] kept in memory. Clones share contents, so a test can
/// hand one clone to the pipeline and inspect another.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    name: String,
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Seed an object without counting it as an upload.
    pub fn insert(&self, key: &str, data: &[u8]) {
        self.inner.lock().unwrap().objects.insert(key.to_string(), data.to_vec());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().unwrap().objects.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.lock().unwrap().objects.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().unwrap().objects.keys().cloned().collect()
    }

    /// Keys uploaded so far, in upload order.
    pub fn uploaded_keys(&self) -> Vec<String> {
        self.inner.lock().unwrap().uploads.clone()
    }

    pub fn upload_count(&self) -> usize {
        self.inner.lock().unwrap().uploads.len()
    }

    pub fn deleted_keys(&self) -> Vec<String> {
        self.inner.lock().unwrap().deletes.clone()
    }

    pub fn inject_failure(&self, op: StoreOp, config: FailureConfig) {
        self.inner.lock().unwrap().failures.inject(op, config);
    }

    pub fn clear_failures(&self) {
        self.inner.lock().unwrap().failures.clear();
    }

    fn put(&self, key: &str, data: Vec<u8>) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(message) = inner.failures.check(StoreOp::Upload, key) {
            return Err(StoreError::Protocol(message));
        }
        inner.objects.insert(key.to_string(), data);
        inner.uploads.push(key.to_string());
        Ok(())
    }
}

impl ObjectStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn list(&self, prefix: &str, max_results: usize) -> Result<Listing, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(message) = inner.failures.check(StoreOp::List, prefix) {
            return Err(StoreError::Protocol(message));
        }
        let mut objects: Vec<StoreObject> = inner
            .objects
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| StoreObject {
                key: k.clone(),
                size: v.len() as u64,
            })
            .collect();
        let truncated = objects.len() > max_results;
        objects.truncate(max_results);
        Ok(Listing { objects, truncated })
    }

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(message) = inner.failures.check(StoreOp::Exists, key) {
            return Err(StoreError::Protocol(message));
        }
        Ok(inner.objects.contains_key(key))
    }

    fn upload(&self, key: &str, source: &Path) -> Result<(), StoreError> {
        let data = fs::read(source)?;
        self.put(key, data)
    }

    fn upload_string(&self, key: &str, content: &str) -> Result<(), StoreError> {
        self.put(key, content.as_bytes().to_vec())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(message) = inner.failures.check(StoreOp::Delete, key) {
            return Err(StoreError::Protocol(message));
        }
        if inner.objects.remove(key).is_none() {
            return Err(StoreError::Protocol(format!("no such key: {}", key)));
        }
        inner.deletes.push(key.to_string());
        Ok(())
    }
}
