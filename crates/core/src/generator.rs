//! The Generator trait, an abstraction over the external text-generation service.
//!
//! The orchestrator makes exactly one `generate` call per chat request and
//! bounds it with its own timeout, so implementations may block for as long
//! as their transport allows.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// A single generation call: the profile's prompt text plus the user message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Full prompt text of the resolved profile.
    pub system_prompt: String,

    /// The user's message, already validated.
    pub user_message: String,
}

impl GenerationRequest {
    pub fn new(system_prompt: impl Into<String>, user_message: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_message: user_message.into(),
        }
    }

    /// The prompt text followed by the user message, as sent to single-turn backends.
    pub fn composed_text(&self) -> String {
        format!(
            "{}\n\nUser question: {}",
            self.system_prompt, self.user_message
        )
    }
}

/// The core Generator trait.
#[async_trait]
pub trait Generator: Send + Sync {
    /// A human-readable name for this generator (e.g. "gemini").
    fn name(&self) -> &str;

    /// Produce reply text for the request.
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError>;

    /// Whether the generator has the credentials it needs to succeed.
    fn is_configured(&self) -> bool {
        true
    }
}
