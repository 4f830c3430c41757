//! Audit logging: a best-effort, append-only record of every chat exchange.
//!
//! Request handlers never talk to a sink directly. They hand records to an
//! [`AuditDispatcher`], which pushes them onto a bounded queue drained by a
//! single background worker. A full or closed queue drops the record and a
//! failing sink is logged; neither ever reaches the chat caller.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use promptline_core::AuditError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// How a chat exchange ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatOutcomeKind {
    Success,
    Fallback,
}

/// A single audit log entry: one question and the answer that was sent back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<FixedOffset>,
    pub sequence: u32,
    pub question: String,
    pub answer: String,
    pub profile_id: String,
    pub outcome: ChatOutcomeKind,
}

impl AuditRecord {
    /// Build a record stamped with the current time at the given UTC offset.
    pub fn now(
        offset: FixedOffset,
        sequence: u32,
        question: impl Into<String>,
        answer: impl Into<String>,
        profile_id: impl Into<String>,
        outcome: ChatOutcomeKind,
    ) -> Self {
        Self {
            timestamp: Utc::now().with_timezone(&offset),
            sequence,
            question: question.into(),
            answer: answer.into(),
            profile_id: profile_id.into(),
            outcome,
        }
    }

    /// Timestamp as `YYYY-MM-DD HH:MM:SS` in the record's own offset.
    pub fn display_timestamp(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// The four spreadsheet columns: timestamp, sequence, question, answer.
    pub fn as_row(&self) -> [serde_json::Value; 4] {
        [
            serde_json::Value::String(self.display_timestamp()),
            serde_json::Value::from(self.sequence),
            serde_json::Value::String(self.question.clone()),
            serde_json::Value::String(self.answer.clone()),
        ]
    }
}

/// Build a `FixedOffset` from whole hours, falling back to UTC when out of range.
pub fn offset_from_hours(hours: i32) -> FixedOffset {
    hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix())
}

/// Trait for audit log sinks (where records are written).
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Short name used in logs and health output.
    fn name(&self) -> &str;

    /// Append one record.
    async fn append(&self, record: &AuditRecord) -> Result<(), AuditError>;
}

/// A tracing-based audit sink that logs records via `tracing::info!`.
pub struct TracingSink;

#[async_trait]
impl AuditSink for TracingSink {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        tracing::info!(
            timestamp = %record.display_timestamp(),
            sequence = record.sequence,
            profile = %record.profile_id,
            outcome = ?record.outcome,
            question_len = record.question.chars().count(),
            answer_len = record.answer.chars().count(),
            "AUDIT"
        );
        Ok(())
    }
}

/// Discards every record.
pub struct NullSink;

#[async_trait]
impl AuditSink for NullSink {
    fn name(&self) -> &str {
        "none"
    }

    async fn append(&self, _record: &AuditRecord) -> Result<(), AuditError> {
        Ok(())
    }
}

/// In-memory sink that stores records in a vector.
/// Useful for testing and small deployments.
#[derive(Default)]
pub struct InMemorySink {
    records: std::sync::Mutex<Vec<AuditRecord>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all stored records.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn count(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl AuditSink for InMemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record.clone());
        Ok(())
    }
}

/// Appends one JSON object per line to a local file.
pub struct JsonlFileSink {
    path: PathBuf,
}

impl JsonlFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AuditSink for JsonlFileSink {
    fn name(&self) -> &str {
        "file"
    }

    async fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let mut line =
            serde_json::to_string(record).map_err(|e| AuditError::WriteFailed(e.to_string()))?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Counters describing what the dispatcher has done so far.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditStats {
    /// Records accepted onto the queue.
    pub queued: u64,
    /// Records the sink acknowledged.
    pub written: u64,
    /// Records dropped because the queue was full or closed.
    pub dropped: u64,
    /// Records the sink failed to write (error or timeout).
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    queued: AtomicU64,
    written: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

/// Cloneable handle that enqueues audit records without waiting.
#[derive(Clone)]
pub struct AuditDispatcher {
    tx: mpsc::Sender<AuditRecord>,
    counters: Arc<Counters>,
    sink_name: Arc<str>,
}

impl std::fmt::Debug for AuditDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditDispatcher")
            .field("sink", &self.sink_name)
            .field("stats", &self.stats())
            .finish()
    }
}

impl AuditDispatcher {
    /// Spawn the background worker and return a handle to it.
    ///
    /// Must be called from within a tokio runtime. The worker exits once every
    /// dispatcher clone has been dropped and the queue is drained.
    pub fn spawn(
        sink: Arc<dyn AuditSink>,
        capacity: usize,
        write_timeout: Duration,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let counters = Arc::new(Counters::default());
        let sink_name: Arc<str> = Arc::from(sink.name());

        let handle = tokio::spawn(run_worker(sink, rx, counters.clone(), write_timeout));

        (
            Self {
                tx,
                counters,
                sink_name,
            },
            handle,
        )
    }

    /// Enqueue a record. Returns `false` if it was dropped.
    pub fn dispatch(&self, record: AuditRecord) -> bool {
        match self.tx.try_send(record) {
            Ok(()) => {
                self.counters.queued.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(mpsc::error::TrySendError::Full(record)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    sink = %self.sink_name,
                    sequence = record.sequence,
                    "Audit queue full, record dropped"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(record)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    sink = %self.sink_name,
                    sequence = record.sequence,
                    "Audit worker stopped, record dropped"
                );
                false
            }
        }
    }

    pub fn sink_name(&self) -> &str {
        &self.sink_name
    }

    pub fn stats(&self) -> AuditStats {
        AuditStats {
            queued: self.counters.queued.load(Ordering::Relaxed),
            written: self.counters.written.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

async fn run_worker(
    sink: Arc<dyn AuditSink>,
    mut rx: mpsc::Receiver<AuditRecord>,
    counters: Arc<Counters>,
    write_timeout: Duration,
) {
    while let Some(record) = rx.recv().await {
        match tokio::time::timeout(write_timeout, sink.append(&record)).await {
            Ok(Ok(())) => {
                counters.written.fetch_add(1, Ordering::Relaxed);
                debug!(sink = %sink.name(), sequence = record.sequence, "Audit record written");
            }
            Ok(Err(e)) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(sink = %sink.name(), error = %e, "Audit write failed (not critical)");
            }
            Err(_) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                let err = AuditError::Timeout {
                    timeout_secs: write_timeout.as_secs(),
                };
                warn!(sink = %sink.name(), error = %err, "Audit write failed (not critical)");
            }
        }
    }
    debug!(sink = %sink.name(), "Audit worker stopped");
}
