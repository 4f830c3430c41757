//! Chat request payload and its validation.

use promptline_config::ChatConfig;
use serde::Deserialize;
use serde_json::Value;

/// A chat request as it arrives on the wire.
///
/// Fields stay loosely typed so validation can report every problem at once
/// instead of stopping at the first deserialization error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatInput {
    #[serde(default)]
    pub message: Option<Value>,

    #[serde(default, alias = "promptcount")]
    pub sequence: Option<Value>,

    #[serde(default)]
    pub profile: Option<String>,
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedChat {
    pub message: String,
    pub sequence: Option<u32>,
}

impl ChatInput {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(Value::String(message.into())),
            ..Self::default()
        }
    }

    pub fn with_sequence(mut self, sequence: u32) -> Self {
        self.sequence = Some(Value::from(sequence));
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Check message and sequence against the configured bounds.
    ///
    /// Returns every violation, message first.
    pub fn validate(&self, limits: &ChatConfig) -> Result<ValidatedChat, Vec<String>> {
        let mut errors = Vec::new();

        let message = match &self.message {
            None | Some(Value::Null) => {
                errors.push("message is required".to_string());
                None
            }
            Some(Value::String(s)) if s.is_empty() => {
                errors.push("message is required".to_string());
                None
            }
            Some(Value::String(s)) => {
                let chars = s.chars().count();
                if chars < limits.min_message_len {
                    errors.push(format!(
                        "message must be at least {} characters",
                        limits.min_message_len
                    ));
                    None
                } else if chars > limits.max_message_len {
                    errors.push(format!(
                        "message must not exceed {} characters",
                        limits.max_message_len
                    ));
                    None
                } else {
                    Some(s.clone())
                }
            }
            Some(_) => {
                errors.push("message must be a string".to_string());
                None
            }
        };

        let sequence = match &self.sequence {
            None | Some(Value::Null) => None,
            Some(value) => match as_integer(value) {
                None => {
                    errors.push("sequence must be an integer".to_string());
                    None
                }
                Some(n) if n < 1 || n > i64::from(limits.max_sequence) => {
                    errors.push(format!(
                        "sequence must be between 1 and {}",
                        limits.max_sequence
                    ));
                    None
                }
                Some(n) => u32::try_from(n).ok(),
            },
        };

        match message {
            Some(message) if errors.is_empty() => Ok(ValidatedChat { message, sequence }),
            _ => Err(errors),
        }
    }
}

/// Integral JSON numbers, including floats with no fractional part.
fn as_integer(value: &Value) -> Option<i64> {
    let Value::Number(number) = value else {
        return None;
    };
    if let Some(n) = number.as_i64() {
        return Some(n);
    }
    if number.is_u64() {
        return Some(i64::MAX);
    }
    number
        .as_f64()
        .filter(|f| f.fract() == 0.0 && f.abs() < 1e15)
        .map(|f| f as i64)
}
