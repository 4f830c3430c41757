//! Error types for the promptline domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`Error`] unifies them.

use thiserror::Error;

/// The top-level error type for promptline operations.
///
/// Generation failures never reach callers through this type; the chat
/// pipeline turns them into a fallback reply.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad input shape or length. Always reported to the caller, never retried.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    #[error("Audit error: {0}")]
    Audit(#[from] AuditError),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("Profile already exists: {0}")]
    AlreadyExists(String),

    /// Id, name, or prompt length violations.
    #[error("Invalid profile: {}", .0.join("; "))]
    Invalid(Vec<String>),

    /// Prompt text failed the security screen.
    #[error("Profile rejected by security screen: {}", .0.join("; "))]
    SecurityRejected(Vec<String>),
}

impl ProfileError {
    /// Human-readable issues carried by the error, one per line item.
    pub fn issues(&self) -> Vec<String> {
        match self {
            Self::Invalid(issues) | Self::SecurityRejected(issues) => issues.clone(),
            other => vec![other.to_string()],
        }
    }
}

/// Failure of a single generation attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Generation timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Malformed generator output: {0}")]
    Malformed(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Failure of an audit sink write. Diagnostic only.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Audit sink unavailable: {0}")]
    Unavailable(String),

    #[error("Audit write failed: {0}")]
    WriteFailed(String),

    #[error("Audit write timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Audit I/O error: {0}")]
    Io(#[from] std::io::Error),
}
