//! InMemoryObjectStore - 開発用・テスト用の object store
//!
//! # 実装詳細
//! - BTreeMap<(bucket, key), bytes> で保持（list が辞書順になる）
//! - Mutex で排他制御
//! - `set_offline(true)` で全操作を Unreachable にできる（fallback の検証用）

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::ports::{ObjectStore, StoreError};

type Objects = BTreeMap<(String, String), Vec<u8>>;

/// # 使用例
/// ```ignore
/// let store = InMemoryObjectStore::new();
/// store.insert("bucket", "job/cert.txt", "...");
/// let bytes = store.get("bucket", "job/cert.txt").await?;
/// ```
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Arc<Mutex<Objects>>,
    offline: AtomicBool,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without going through the async API.
    pub fn insert(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        if let Ok(mut objects) = self.objects.lock() {
            objects.insert((bucket.to_string(), key.to_string()), body.into());
        }
    }

    /// Read an object back as text, for assertions.
    pub fn text(&self, bucket: &str, key: &str) -> Option<String> {
        let objects = self.objects.lock().ok()?;
        let body = objects.get(&(bucket.to_string(), key.to_string()))?;
        String::from_utf8(body.clone()).ok()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable("in-memory store is offline".into()));
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Objects>, StoreError> {
        self.objects
            .lock()
            .map_err(|e| StoreError::Rejected(format!("store lock poisoned: {e}")))
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        self.check_online()?;
        let objects = self.lock()?;
        objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        self.check_online()?;
        let mut objects = self.lock()?;
        objects.insert((bucket.to_string(), key.to_string()), body);
        Ok(())
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.check_online()?;
        let objects = self.lock()?;
        Ok(objects
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .map(|(_, k)| k.clone())
            .collect())
    }
}
