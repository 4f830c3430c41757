//! Data model for usage counters and the snapshots derived from them.

use serde::{Deserialize, Serialize};

/// Raw per-profile counters. Only ever incremented.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageRecord {
    /// Completed generation attempts.
    pub count: u64,
    /// Sum of attempt latencies in milliseconds.
    pub total_latency_ms: u64,
    pub success_count: u64,
    pub failure_count: u64,
}

impl UsageRecord {
    /// Fold one attempt into the counters.
    pub fn add(&mut self, elapsed_ms: u64, success: bool) {
        self.count += 1;
        self.total_latency_ms = self.total_latency_ms.saturating_add(elapsed_ms);
        if success {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
    }

    /// Derive averages and rates. Returns `None` before the first attempt.
    pub fn snapshot(&self) -> Option<UsageSnapshot> {
        if self.count == 0 {
            return None;
        }
        let count = self.count as f64;
        Some(UsageSnapshot {
            count: self.count,
            avg_latency_ms: self.total_latency_ms as f64 / count,
            success_rate: self.success_count as f64 / count,
            failure_rate: self.failure_count as f64 / count,
        })
    }
}

/// Point-in-time view of a profile's usage. Stale as soon as it is returned.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct UsageSnapshot {
    pub count: u64,
    pub avg_latency_ms: f64,
    pub success_rate: f64,
    pub failure_rate: f64,
}
