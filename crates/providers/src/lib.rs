//! Outbound clients for promptline.
//!
//! [`GeminiGenerator`] implements the core `Generator` trait against the
//! Gemini `generateContent` endpoint. [`WebhookSink`] implements the audit
//! sink trait by posting spreadsheet rows to an HTTP endpoint.

pub mod gemini;
pub mod webhook;

pub use gemini::GeminiGenerator;
pub use webhook::WebhookSink;
