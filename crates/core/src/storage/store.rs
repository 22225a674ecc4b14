use async_trait::async_trait;

use crate::errors::CoreError;

/// The key-value storage interface the sync layer writes through.
///
/// Keys are namespaced per user (`user_<id>`); values are JSON-encoded
/// asset-list snapshots. Whole-snapshot semantics, last write wins — no
/// delta sync, no multi-writer conflict resolution.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CoreError>;
    async fn put(&self, key: &str, value: &str) -> Result<(), CoreError>;
    async fn delete(&self, key: &str) -> Result<(), CoreError>;
}

/// The snapshot key for a user id.
pub fn user_key(user_id: &str) -> String {
    format!("user_{user_id}")
}
