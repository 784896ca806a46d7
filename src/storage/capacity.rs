//! Capacity diagnostics for the durable store
//!
//! Read-only: reports how much of the assumed ceiling is in use and never
//! evicts anything.

use super::backend::entry_size;
use crate::config::StorageConfig;
use crate::crypto::CryptoStore;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Capacity tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityStatus {
    Healthy,
    Warning,
    Critical,
}

impl std::fmt::Display for CapacityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapacityStatus::Healthy => write!(f, "healthy"),
            CapacityStatus::Warning => write!(f, "warning"),
            CapacityStatus::Critical => write!(f, "critical"),
        }
    }
}

/// Snapshot of durable store usage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityReport {
    pub used_bytes: u64,
    pub ceiling_bytes: u64,
    pub percentage: f64,
    pub status: CapacityStatus,
    pub entries: usize,
}

/// Byte-size monitor over the durable store
pub struct CapacityMonitor {
    ceiling_bytes: u64,
    warning_bytes: u64,
    critical_bytes: u64,
}

impl CapacityMonitor {
    /// Create a monitor from storage configuration
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            ceiling_bytes: config.quota_bytes,
            warning_bytes: config.warning_bytes,
            critical_bytes: config.critical_bytes,
        }
    }

    /// Classify a byte count
    pub fn classify(&self, used_bytes: u64) -> CapacityStatus {
        if used_bytes >= self.critical_bytes {
            CapacityStatus::Critical
        } else if used_bytes >= self.warning_bytes {
            CapacityStatus::Warning
        } else {
            CapacityStatus::Healthy
        }
    }

    /// Measure the encoded size of every entry in the store
    pub fn report(&self, store: &CryptoStore) -> Result<CapacityReport> {
        let entries = store.entries()?;
        let used_bytes: u64 = entries.iter().map(|(k, v)| entry_size(k, v)).sum();
        let percentage = if self.ceiling_bytes == 0 {
            100.0
        } else {
            used_bytes as f64 / self.ceiling_bytes as f64 * 100.0
        };

        Ok(CapacityReport {
            used_bytes,
            ceiling_bytes: self.ceiling_bytes,
            percentage,
            status: self.classify(used_bytes),
            entries: entries.len(),
        })
    }
}
