use log::warn;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::errors::CoreError;
use crate::models::asset::Asset;

use super::store::{user_key, KvStore};

/// Write-behind snapshot sync.
///
/// The in-memory asset list is authoritative during a session; this
/// service mirrors it to the store as a whole JSON snapshot. Mutations
/// mark the snapshot dirty and `maybe_flush` writes through at most once
/// per flush window. A failed flush keeps the dirty flag and is retried
/// on the next window — never in a tight loop.
pub struct SyncService {
    store: Arc<dyn KvStore>,
    key: String,
    flush_interval: Duration,
    dirty: bool,
    last_attempt: Option<Instant>,
    /// Last flush failure, for the UI's one-line status indicator.
    last_error: Option<String>,
}

impl SyncService {
    pub fn new(store: Arc<dyn KvStore>, user_id: &str, flush_interval: Duration) -> Self {
        Self {
            store,
            key: user_key(user_id),
            flush_interval,
            dirty: false,
            last_attempt: None,
            last_error: None,
        }
    }

    /// Load the stored snapshot. Returns None when the store has nothing
    /// (or an empty list) for this user — remote only wins when non-empty.
    pub async fn load(&self) -> Result<Option<Vec<Asset>>, CoreError> {
        let Some(raw) = self.store.get(&self.key).await? else {
            return Ok(None);
        };
        let assets: Vec<Asset> = serde_json::from_str(&raw)?;
        if assets.is_empty() {
            return Ok(None);
        }
        Ok(Some(assets))
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The most recent flush failure, if the snapshot is still unsynced.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Write the snapshot through if it is dirty and the flush window has
    /// elapsed. Returns true when a write actually succeeded.
    pub async fn maybe_flush(&mut self, assets: &[Asset]) -> bool {
        if !self.dirty {
            return false;
        }
        if let Some(at) = self.last_attempt {
            if at.elapsed() < self.flush_interval {
                return false;
            }
        }
        match self.flush_now(assets).await {
            Ok(()) => true,
            Err(e) => {
                warn!("snapshot flush failed, will retry next window: {e}");
                false
            }
        }
    }

    /// Write the snapshot through unconditionally.
    pub async fn flush_now(&mut self, assets: &[Asset]) -> Result<(), CoreError> {
        self.last_attempt = Some(Instant::now());
        let snapshot = serde_json::to_string(assets)
            .map_err(|e| CoreError::Serialization(e.to_string()))?;
        match self.store.put(&self.key, &snapshot).await {
            Ok(()) => {
                self.dirty = false;
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }
}
