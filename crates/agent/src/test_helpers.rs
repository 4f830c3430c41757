//! Generator and audit sink doubles for orchestrator tests.

use async_trait::async_trait;
use promptline_core::{AuditError, GenerationError, GenerationRequest, Generator};
use promptline_security::{AuditRecord, AuditSink};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};

/// Always answers with the same text and remembers the last request.
pub struct FixedGenerator {
    reply: String,
    calls: AtomicUsize,
    last: Mutex<Option<GenerationRequest>>,
}

impl FixedGenerator {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.into(),
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for FixedGenerator {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(request);
        Ok(self.reply.clone())
    }
}

/// Sleeps before answering.
pub struct SlowGenerator {
    delay: Duration,
}

impl SlowGenerator {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Generator for SlowGenerator {
    fn name(&self) -> &str {
        "slow"
    }

    async fn generate(&self, _request: GenerationRequest) -> Result<String, GenerationError> {
        tokio::time::sleep(self.delay).await;
        Ok("too late".into())
    }
}

pub struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _request: GenerationRequest) -> Result<String, GenerationError> {
        Err(GenerationError::Transport("connection refused".into()))
    }
}

pub struct EmptyGenerator;

#[async_trait]
impl Generator for EmptyGenerator {
    fn name(&self) -> &str {
        "empty"
    }

    async fn generate(&self, _request: GenerationRequest) -> Result<String, GenerationError> {
        Ok("  ".into())
    }
}

/// Parks every request until released, then echoes the system prompt.
pub struct HeldGenerator {
    started: Notify,
    release: Semaphore,
    last: Mutex<Option<GenerationRequest>>,
}

impl HeldGenerator {
    pub fn new() -> Self {
        Self {
            started: Notify::new(),
            release: Semaphore::new(0),
            last: Mutex::new(None),
        }
    }

    /// Resolves once a request is parked inside `generate`.
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub fn release(&self) {
        self.release.add_permits(1);
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for HeldGenerator {
    fn name(&self) -> &str {
        "held"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        *self.last.lock().unwrap() = Some(request.clone());
        self.started.notify_one();
        let _permit = self
            .release
            .acquire()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        Ok(request.system_prompt)
    }
}

/// Rejects every record.
pub struct BrokenSink;

#[async_trait]
impl AuditSink for BrokenSink {
    fn name(&self) -> &str {
        "broken"
    }

    async fn append(&self, _record: &AuditRecord) -> Result<(), AuditError> {
        Err(AuditError::WriteFailed("spreadsheet returned 503".into()))
    }
}

/// Never finishes a write until the gate gets permits.
pub struct StuckSink {
    pub gate: Semaphore,
}

impl StuckSink {
    pub fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
        }
    }
}

#[async_trait]
impl AuditSink for StuckSink {
    fn name(&self) -> &str {
        "stuck"
    }

    async fn append(&self, _record: &AuditRecord) -> Result<(), AuditError> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| AuditError::Unavailable(e.to_string()))?;
        Ok(())
    }
}
