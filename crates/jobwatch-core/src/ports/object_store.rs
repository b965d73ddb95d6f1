//! ObjectStore port - リモートの object store（S3 互換）
//!
//! bucket + key でバイト列を読み書きし、prefix で key を列挙します。
//!
//! # 設計原則
//! - リトライ・バックオフはしない（必要なら呼び出し側で包む）
//! - put は常にオブジェクト全体を上書きする

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    /// Network failure, expired session, or the store is down.
    #[error("object store unreachable: {0}")]
    Unreachable(String),

    #[error("object store rejected the request: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Replace the object at `bucket/key` with `body`.
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StoreError>;

    /// Keys in `bucket` starting with `prefix`, in lexicographic order.
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StoreError>;
}
