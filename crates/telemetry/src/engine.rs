//! Thread-safe usage metrics keyed by profile id.

use crate::model::{UsageRecord, UsageSnapshot};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

/// Per-profile usage aggregation.
///
/// Thread-safe via `RwLock`; writers hold the lock only for a counter update,
/// so concurrent `record` calls never lose increments.
#[derive(Debug, Default)]
pub struct UsageMetrics {
    records: RwLock<HashMap<String, UsageRecord>>,
}

impl UsageMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed generation attempt for `profile_id`.
    pub fn record(&self, profile_id: &str, elapsed_ms: u64, success: bool) {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        match records.get_mut(profile_id) {
            Some(rec) => rec.add(elapsed_ms, success),
            None => {
                let mut rec = UsageRecord::default();
                rec.add(elapsed_ms, success);
                records.insert(profile_id.to_string(), rec);
            }
        }
        tracing::debug!(profile = %profile_id, elapsed_ms, success, "Usage recorded");
    }

    /// Derived metrics for one profile, or `None` if it was never used.
    pub fn snapshot(&self, profile_id: &str) -> Option<UsageSnapshot> {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(profile_id)
            .and_then(UsageRecord::snapshot)
    }

    /// Snapshots for every profile with at least one attempt, ordered by id.
    pub fn all(&self) -> BTreeMap<String, UsageSnapshot> {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter_map(|(id, rec)| rec.snapshot().map(|snap| (id.clone(), snap)))
            .collect()
    }

    /// Raw counters for one profile.
    pub fn raw(&self, profile_id: &str) -> Option<UsageRecord> {
        self.records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(profile_id)
            .copied()
    }
}
