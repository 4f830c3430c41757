//! The chat pipeline: validate, resolve profile, generate, record, audit.

use chrono::FixedOffset;
use promptline_config::{AppConfig, ChatConfig};
use promptline_core::{Error, GenerationError, GenerationRequest, Generator};
use promptline_profiles::ProfileRegistry;
use promptline_security::{AuditDispatcher, AuditRecord, ChatOutcomeKind, offset_from_hours};
use promptline_telemetry::UsageMetrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::input::ChatInput;

/// Tunables for [`ChatOrchestrator`].
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub limits: ChatConfig,
    pub generation_timeout: Duration,
    /// Offset used to stamp audit records.
    pub audit_offset: FixedOffset,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl ChatSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            limits: config.chat.clone(),
            generation_timeout: Duration::from_secs(config.generator.timeout_secs),
            audit_offset: offset_from_hours(config.audit.utc_offset_hours),
        }
    }
}

/// Result of a chat request that got as far as generation.
#[derive(Debug, Clone)]
pub enum ChatOutcome {
    Replied {
        reply: String,
        profile_id: String,
        request_id: Uuid,
        elapsed_ms: u64,
    },
    /// Generation failed; `reply` is the configured fallback text.
    Fallback {
        reply: String,
        profile_id: String,
        request_id: Uuid,
        error: GenerationError,
    },
}

impl ChatOutcome {
    pub fn reply(&self) -> &str {
        match self {
            Self::Replied { reply, .. } | Self::Fallback { reply, .. } => reply,
        }
    }

    pub fn profile_id(&self) -> &str {
        match self {
            Self::Replied { profile_id, .. } | Self::Fallback { profile_id, .. } => profile_id,
        }
    }

    pub fn request_id(&self) -> Uuid {
        match self {
            Self::Replied { request_id, .. } | Self::Fallback { request_id, .. } => *request_id,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Drives one chat request from raw input to reply.
///
/// Holds no per-request state, so one instance serves all requests
/// concurrently. Shared locks inside the registry and metrics are never held
/// across the generation await.
pub struct ChatOrchestrator {
    registry: Arc<ProfileRegistry>,
    metrics: Arc<UsageMetrics>,
    generator: Arc<dyn Generator>,
    audit: Option<AuditDispatcher>,
    settings: ChatSettings,
}

impl ChatOrchestrator {
    pub fn new(
        registry: Arc<ProfileRegistry>,
        metrics: Arc<UsageMetrics>,
        generator: Arc<dyn Generator>,
        settings: ChatSettings,
    ) -> Self {
        Self {
            registry,
            metrics,
            generator,
            audit: None,
            settings,
        }
    }

    /// Attach the audit dispatcher. Without one, outcomes are not audited.
    pub fn with_audit(mut self, audit: AuditDispatcher) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn registry(&self) -> &Arc<ProfileRegistry> {
        &self.registry
    }

    pub fn metrics(&self) -> &Arc<UsageMetrics> {
        &self.metrics
    }

    pub fn generator(&self) -> &Arc<dyn Generator> {
        &self.generator
    }

    pub fn audit(&self) -> Option<&AuditDispatcher> {
        self.audit.as_ref()
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    /// Handle one chat request.
    ///
    /// `header_profile` takes precedence over the body's `profile` field.
    /// Errors are client errors only: `Error::Validation` or
    /// `Error::Profile(NotFound)`. Generation failures come back as
    /// [`ChatOutcome::Fallback`].
    pub async fn handle(
        &self,
        input: ChatInput,
        header_profile: Option<&str>,
    ) -> Result<ChatOutcome, Error> {
        let request_id = Uuid::new_v4();

        let chat = input.validate(&self.settings.limits).map_err(|details| {
            debug!(%request_id, errors = details.len(), "Chat request failed validation");
            Error::Validation(details)
        })?;

        let requested = header_profile
            .or(input.profile.as_deref())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(self.settings.limits.default_profile.as_str());

        let profile = self.registry.activate(requested).map_err(|e| {
            warn!(%request_id, profile = %requested, "Chat request named unknown profile");
            Error::Profile(e)
        })?;

        let sequence = chat.sequence.unwrap_or(1);
        info!(
            %request_id,
            profile = %profile.id,
            sequence,
            preview = %preview(&chat.message),
            "Processing chat message"
        );

        let request = GenerationRequest::new(profile.prompt.clone(), chat.message.clone());
        let started = Instant::now();
        let result = match tokio::time::timeout(
            self.settings.generation_timeout,
            self.generator.generate(request),
        )
        .await
        {
            Ok(Ok(text)) if text.trim().is_empty() => {
                Err(GenerationError::Malformed("reply text is empty".into()))
            }
            Ok(other) => other,
            Err(_) => Err(GenerationError::Timeout {
                timeout_secs: self.settings.generation_timeout.as_secs(),
            }),
        };
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        self.metrics.record(&profile.id, elapsed_ms, result.is_ok());

        let outcome = match result {
            Ok(reply) => {
                info!(
                    %request_id,
                    profile = %profile.id,
                    elapsed_ms,
                    preview = %preview(&reply),
                    "Reply generated"
                );
                ChatOutcome::Replied {
                    reply,
                    profile_id: profile.id.clone(),
                    request_id,
                    elapsed_ms,
                }
            }
            Err(error) => {
                warn!(
                    %request_id,
                    profile = %profile.id,
                    elapsed_ms,
                    error = %error,
                    "Generation failed, sending fallback reply"
                );
                ChatOutcome::Fallback {
                    reply: self.settings.limits.fallback_reply.clone(),
                    profile_id: profile.id.clone(),
                    request_id,
                    error,
                }
            }
        };

        if let Some(audit) = &self.audit {
            let kind = if outcome.is_fallback() {
                ChatOutcomeKind::Fallback
            } else {
                ChatOutcomeKind::Success
            };
            let record = AuditRecord::now(
                self.settings.audit_offset,
                sequence,
                chat.message,
                outcome.reply(),
                &profile.id,
                kind,
            );
            if !audit.dispatch(record) {
                debug!(%request_id, "Audit record not queued");
            }
        }

        Ok(outcome)
    }

    /// Ids of every registered profile, for unknown-profile responses.
    pub fn available_profiles(&self) -> Vec<String> {
        self.registry.list().into_iter().map(|p| p.id).collect()
    }
}

const PREVIEW_CHARS: usize = 50;

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
