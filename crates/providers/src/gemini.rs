//! Gemini `generateContent` client.
//!
//! The profile prompt and the user message are sent as a single text part.
//! Sampling parameters and safety thresholds come from `[generator]` config.

use async_trait::async_trait;
use promptline_config::GeneratorConfig;
use promptline_core::{GenerationError, GenerationRequest, Generator};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const SAFETY_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];
const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

/// A Gemini text generator.
pub struct GeminiGenerator {
    base_url: String,
    model: String,
    api_key: Option<String>,
    generation: GenerationConfig,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiGenerator")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl GeminiGenerator {
    pub fn from_config(config: &GeneratorConfig) -> Result<Self, GenerationError> {
        // The orchestrator enforces the real deadline; this only keeps a
        // stalled connection from outliving it by much.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.saturating_add(5)))
            .build()
            .map_err(|e| GenerationError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            generation: GenerationConfig {
                temperature: config.temperature,
                top_k: config.top_k,
                top_p: config.top_p,
                max_output_tokens: config.max_output_tokens,
            },
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_body(&self, request: &GenerationRequest) -> ApiRequest {
        ApiRequest {
            contents: vec![ApiContent {
                parts: vec![ApiPart {
                    text: request.composed_text(),
                }],
            }],
            generation_config: self.generation.clone(),
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|category| SafetySetting {
                    category: (*category).to_string(),
                    threshold: SAFETY_THRESHOLD.to_string(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(GenerationError::Transport("API key is not configured".into()));
        };

        let body = self.build_body(&request);
        debug!(model = %self.model, "Sending generateContent request");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %error_body, "Generator returned error");
            return Err(GenerationError::Transport(format!(
                "generator returned HTTP {}",
                status.as_u16()
            )));
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(format!("response is not JSON: {e}")))?;

        extract_reply(&value)
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Pull `candidates[0].content.parts[0].text` out of a response body.
///
/// A missing path or blank text is malformed output.
pub fn extract_reply(value: &serde_json::Value) -> Result<String, GenerationError> {
    let text = value
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(|t| t.as_str())
        .ok_or_else(|| {
            let reason = value
                .pointer("/candidates/0/finishReason")
                .and_then(|r| r.as_str())
                .unwrap_or("no text part");
            GenerationError::Malformed(format!("missing reply text ({reason})"))
        })?;

    if text.trim().is_empty() {
        return Err(GenerationError::Malformed("reply text is empty".into()));
    }
    Ok(text.to_string())
}

// --- Wire types ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest {
    contents: Vec<ApiContent>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiContent {
    parts: Vec<ApiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiPart {
    text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: String,
    threshold: String,
}
