//! Per-profile usage metrics for promptline.
//!
//! Every completed generation attempt is recorded against the profile that
//! served it. Aggregates are kept as monotonic counters; averages and rates
//! are derived when a snapshot is taken.

pub mod engine;
pub mod model;

pub use engine::UsageMetrics;
pub use model::{UsageRecord, UsageSnapshot};
