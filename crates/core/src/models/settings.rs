use serde::{Deserialize, Serialize};

/// User-configurable settings for the refresh loop and sync layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// User id namespacing the remote snapshot key (`user_<id>`)
    pub user_id: String,

    /// Refresh cadence in milliseconds. 0 = manual-only refresh.
    pub refresh_interval_ms: u64,

    /// Minimum gap between snapshot write-throughs, in milliseconds.
    pub flush_interval_ms: u64,

    /// Maximum routing codes per batch quote request (bounds URL size).
    pub batch_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_id: "default".to_string(),
            refresh_interval_ms: 10_000,
            flush_interval_ms: 5_000,
            batch_size: 20,
        }
    }
}
