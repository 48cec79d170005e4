//! Replica configuration
//!
//! All fields have defaults, so an empty JSON object is a valid config:
//!
//! ```rust
//! use synckit_sequence::SyncConfig;
//!
//! let config = SyncConfig::from_json(r#"{"sweepIntervalMs": 500}"#).unwrap();
//! assert_eq!(config.sweep_interval().as_millis(), 500);
//! assert!(config.sweep_on_admit);
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default interval between periodic pending-queue sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(2);

/// Pending-queue length above which each newly parked operation logs a warning
pub const DEFAULT_PENDING_WARN_THRESHOLD: usize = 1024;

/// Tunables for a document replica
///
/// None of these affect correctness: an operation may stay parked for any
/// length of time and still integrate correctly once its anchors arrive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncConfig {
    /// Interval of the background sweeper, in milliseconds
    pub sweep_interval_ms: u64,

    /// Sweep the pending queue right after a remote operation integrates
    pub sweep_on_admit: bool,

    /// Warn when the pending queue grows past this many operations
    pub pending_warn_threshold: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL.as_millis() as u64,
            sweep_on_admit: true,
            pending_warn_threshold: DEFAULT_PENDING_WARN_THRESHOLD,
        }
    }
}

impl SyncConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }
}
