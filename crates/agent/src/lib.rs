//! Chat orchestration for promptline.
//!
//! A request moves through a fixed sequence of stages:
//!
//! 1. **Validate** the message and optional sequence number
//! 2. **Resolve** the behavior profile (header, body field, or default)
//! 3. **Generate** a reply under a hard timeout
//! 4. **Record** latency and outcome in usage metrics
//! 5. **Audit** the exchange through the background dispatcher, without waiting
//!
//! Any generation failure is answered with the configured fallback reply.

pub mod input;
pub mod orchestrator;

#[cfg(test)]
mod test_helpers;

pub use input::{ChatInput, ValidatedChat};
pub use orchestrator::{ChatOrchestrator, ChatOutcome, ChatSettings};
