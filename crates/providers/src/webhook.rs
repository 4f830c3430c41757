//! HTTP audit sink that appends spreadsheet rows.
//!
//! Each record is posted as `{"values": [[timestamp, sequence, question, answer]]}`,
//! the shape spreadsheet append endpoints accept.

use async_trait::async_trait;
use promptline_core::AuditError;
use promptline_security::{AuditRecord, AuditSink};
use std::time::Duration;
use tracing::debug;

pub struct WebhookSink {
    url: String,
    client: reqwest::Client,
}

impl WebhookSink {
    /// `timeout` bounds a single POST. The dispatcher applies its own
    /// per-write deadline on top.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AuditError> {
        let url = url.into();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AuditError::Unavailable(format!(
                "webhook URL must be http(s): {url}"
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuditError::Unavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { url, client })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Request body for one record.
pub fn row_payload(record: &AuditRecord) -> serde_json::Value {
    serde_json::json!({ "values": [record.as_row()] })
}

#[async_trait]
impl AuditSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let response = self
            .client
            .post(&self.url)
            .json(&row_payload(record))
            .send()
            .await
            .map_err(|e| AuditError::WriteFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuditError::WriteFailed(format!(
                "webhook returned HTTP {}",
                status.as_u16()
            )));
        }
        debug!(sequence = record.sequence, "Audit row posted");
        Ok(())
    }
}
