//! Configuration loading, validation, and management for promptline.
//!
//! Loads configuration from `~/.promptline/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.promptline/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP listener and CORS settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Text-generation backend
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Chat request validation and fallback behaviour
    #[serde(default)]
    pub chat: ChatConfig,

    /// Profile registry settings and startup profiles
    #[serde(default)]
    pub profiles: ProfilesConfig,

    /// Audit log sink
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Allowed CORS origins. `["*"]` allows any origin.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_port() -> u16 {
    5002
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            cors_origins: default_cors_origins(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_generator_base_url")]
    pub base_url: String,

    #[serde(default = "default_generator_model")]
    pub model: String,

    /// Hard upper bound for one generation call
    #[serde(default = "default_generator_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

fn default_generator_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}
fn default_generator_model() -> String {
    "gemini-2.0-flash".into()
}
fn default_generator_timeout() -> u64 {
    30
}
fn default_temperature() -> f32 {
    0.7
}
fn default_top_k() -> u32 {
    40
}
fn default_top_p() -> f32 {
    0.95
}
fn default_max_output_tokens() -> u32 {
    1024
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_generator_base_url(),
            model: default_generator_model(),
            timeout_secs: default_generator_timeout(),
            temperature: default_temperature(),
            top_k: default_top_k(),
            top_p: default_top_p(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

impl std::fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("top_k", &self.top_k)
            .field("top_p", &self.top_p)
            .field("max_output_tokens", &self.max_output_tokens)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_min_message_len")]
    pub min_message_len: usize,

    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,

    /// Upper bound for the optional per-session sequence counter
    #[serde(default = "default_max_sequence")]
    pub max_sequence: u32,

    /// Profile used when a request names none
    #[serde(default = "default_profile_id")]
    pub default_profile: String,

    /// Reply sent when generation fails. Must not reveal upstream details.
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,
}

fn default_min_message_len() -> usize {
    1
}
fn default_max_message_len() -> usize {
    1000
}
fn default_max_sequence() -> u32 {
    1000
}
fn default_profile_id() -> String {
    "JKU_ASSISTANT".into()
}
fn default_fallback_reply() -> String {
    "Sorry, a technical error occurred. Please try again later or contact support.".into()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            min_message_len: default_min_message_len(),
            max_message_len: default_max_message_len(),
            max_sequence: default_max_sequence(),
            default_profile: default_profile_id(),
            fallback_reply: default_fallback_reply(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilesConfig {
    /// Maximum number of switch records kept in memory
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Custom profiles registered at startup (screened like API registrations)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom: Vec<CustomProfileConfig>,
}

fn default_history_capacity() -> usize {
    1_000
}

impl Default for ProfilesConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            custom: vec![],
        }
    }
}

/// A custom profile declared in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomProfileConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Which audit sink receives chat records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// Log records through `tracing`
    Tracing,
    /// Append JSON lines to a local file
    File,
    /// POST each record as a spreadsheet row to a webhook
    Webhook,
    /// Discard records
    None,
}

impl std::fmt::Display for AuditSinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tracing => write!(f, "tracing"),
            Self::File => write!(f, "file"),
            Self::Webhook => write!(f, "webhook"),
            Self::None => write!(f, "none"),
        }
    }
}

impl std::str::FromStr for AuditSinkKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tracing" => Ok(Self::Tracing),
            "file" => Ok(Self::File),
            "webhook" => Ok(Self::Webhook),
            "none" => Ok(Self::None),
            other => Err(ConfigError::ValidationError(format!(
                "unknown audit sink '{other}' (expected tracing, file, webhook or none)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_audit_sink")]
    pub sink: AuditSinkKind,

    /// Target file for the `file` sink
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Target URL for the `webhook` sink
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    /// Bounded queue size between request handlers and the sink worker
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Per-write timeout for the sink
    #[serde(default = "default_audit_timeout")]
    pub timeout_secs: u64,

    /// Fixed UTC offset used to render audit timestamps
    #[serde(default = "default_utc_offset")]
    pub utc_offset_hours: i32,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_audit_sink() -> AuditSinkKind {
    AuditSinkKind::Tracing
}
fn default_queue_capacity() -> usize {
    256
}
fn default_audit_timeout() -> u64 {
    10
}
fn default_utc_offset() -> i32 {
    3
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            sink: default_audit_sink(),
            path: None,
            webhook_url: None,
            queue_capacity: default_queue_capacity(),
            timeout_secs: default_audit_timeout(),
            utc_offset_hours: default_utc_offset(),
            enabled: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.promptline/config.toml),
    /// then apply environment overrides from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load configuration from `path`, then apply process environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    ///
    /// Recognised keys:
    /// - `PROMPTLINE_API_KEY`, then `GEMINI_API_KEY` (only if no key is configured)
    /// - `HOST`, `PORT`
    /// - `CORS_ORIGIN` (comma-separated)
    /// - `PROMPTLINE_AUDIT_SINK`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.generator.api_key.is_none() {
            self.generator.api_key = lookup("PROMPTLINE_API_KEY")
                .or_else(|| lookup("GEMINI_API_KEY"))
                .filter(|k| !k.trim().is_empty());
        }

        if let Some(host) = lookup("HOST") {
            self.gateway.host = host;
        }

        if let Some(port) = lookup("PORT") {
            self.gateway.port = port.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("PORT must be a port number, got '{port}'"))
            })?;
        }

        if let Some(origins) = lookup("CORS_ORIGIN") {
            self.gateway.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        if let Some(sink) = lookup("PROMPTLINE_AUDIT_SINK") {
            self.audit.sink = sink.parse()?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".promptline")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generator.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "generator.timeout_secs must be > 0".into(),
            ));
        }

        if self.generator.temperature < 0.0 || self.generator.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "generator.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.chat.min_message_len == 0 || self.chat.min_message_len > self.chat.max_message_len
        {
            return Err(ConfigError::ValidationError(
                "chat.min_message_len must be >= 1 and <= chat.max_message_len".into(),
            ));
        }

        if self.chat.max_sequence == 0 {
            return Err(ConfigError::ValidationError(
                "chat.max_sequence must be > 0".into(),
            ));
        }

        if self.chat.fallback_reply.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "chat.fallback_reply must not be empty".into(),
            ));
        }

        if self.profiles.history_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "profiles.history_capacity must be > 0".into(),
            ));
        }

        if self.audit.queue_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "audit.queue_capacity must be > 0".into(),
            ));
        }

        if !(-12..=14).contains(&self.audit.utc_offset_hours) {
            return Err(ConfigError::ValidationError(
                "audit.utc_offset_hours must be between -12 and 14".into(),
            ));
        }

        match self.audit.sink {
            AuditSinkKind::File if self.audit.path.is_none() => {
                return Err(ConfigError::ValidationError(
                    "audit.path is required when audit.sink = \"file\"".into(),
                ));
            }
            AuditSinkKind::Webhook if self.audit.webhook_url.is_none() => {
                return Err(ConfigError::ValidationError(
                    "audit.webhook_url is required when audit.sink = \"webhook\"".into(),
                ));
            }
            _ => {}
        }

        Ok(())
    }

    /// Check if a generator API key is available.
    pub fn has_api_key(&self) -> bool {
        self.generator.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
