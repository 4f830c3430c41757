//! Security module for promptline: prompt screening and audit logging.
//!
//! Provides:
//! - **Screening**: heuristic checks on profile prompt text
//! - **Audit logging**: best-effort record of every chat exchange, written by a
//!   background worker behind a bounded queue

pub mod audit;
pub mod screen;

pub use audit::{
    AuditDispatcher, AuditRecord, AuditSink, AuditStats, ChatOutcomeKind, InMemorySink,
    JsonlFileSink, NullSink, TracingSink, offset_from_hours,
};
pub use screen::{
    MAX_PROMPT_CHARS, MIN_PROMPT_CHARS, ScreenReport, check_prompt_length, screen_prompt,
};
