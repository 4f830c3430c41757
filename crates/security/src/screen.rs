//! Prompt screening: heuristic checks applied to profile text before it is
//! registered.
//!
//! The screen runs four independent sub-checks and unions their findings.
//! It is pattern matching, so a paraphrased instruction gets through; treat
//! it as a tripwire for obvious abuse, not as an isolation boundary.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Minimum prompt length in characters.
pub const MIN_PROMPT_CHARS: usize = 50;
/// Maximum prompt length in characters.
pub const MAX_PROMPT_CHARS: usize = 10_000;

/// Phrases that try to replace or hijack the model's role.
const FORBIDDEN_PHRASES: &[&str] = &[
    "ignore previous instructions",
    "forget everything",
    "you are now",
    "pretend to be",
    "act as if",
];

/// (pattern, label) pairs. Labels are what the issue message reports.
const INJECTION_PATTERNS: &[(&str, &str)] = &[
    (r"(?i)system\s*:", "system:"),
    (r"(?i)assistant\s*:", "assistant:"),
    (r"(?i)user\s*:", "user:"),
    (r"(?i)<script", "<script"),
    (r"(?i)javascript:", "javascript:"),
];

const SENSITIVE_PATTERNS: &[(&str, &str)] = &[
    (r"(?i)password", "password"),
    (r"(?i)secret", "secret"),
    (r"(?i)private\s+key", "private key"),
    (r"(?i)api\s+key", "api key"),
    (r"(?i)token", "token"),
];

const BYPASS_PATTERNS: &[(&str, &str)] = &[
    (r"(?i)override", "override"),
    (r"(?i)bypass", "bypass"),
    (r"(?i)hack", "hack"),
    (r"(?i)exploit", "exploit"),
    (r"(?i)vulnerability", "vulnerability"),
];

struct PatternSet {
    patterns: Vec<(Regex, &'static str)>,
}

impl PatternSet {
    fn compile(specs: &'static [(&'static str, &'static str)]) -> Self {
        let patterns = specs
            .iter()
            .filter_map(|(pattern, label)| match Regex::new(pattern) {
                Ok(re) => Some((re, *label)),
                Err(e) => {
                    tracing::error!(pattern, error = %e, "Invalid screening pattern skipped");
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    fn matches(&self, text: &str) -> Vec<&'static str> {
        self.patterns
            .iter()
            .filter(|(re, _)| re.is_match(text))
            .map(|(_, label)| *label)
            .collect()
    }
}

static INJECTION: LazyLock<PatternSet> = LazyLock::new(|| PatternSet::compile(INJECTION_PATTERNS));
static SENSITIVE: LazyLock<PatternSet> = LazyLock::new(|| PatternSet::compile(SENSITIVE_PATTERNS));
static BYPASS: LazyLock<PatternSet> = LazyLock::new(|| PatternSet::compile(BYPASS_PATTERNS));

/// Outcome of screening a piece of prompt text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScreenReport {
    pub valid: bool,
    pub issues: Vec<String>,
}

impl ScreenReport {
    fn from_issues(issues: Vec<String>) -> Self {
        Self {
            valid: issues.is_empty(),
            issues,
        }
    }
}

/// Run all four sub-checks. Never fails; an empty issue list means the text passed.
pub fn screen_prompt(text: &str) -> ScreenReport {
    let issues = [
        check_forbidden_phrases(text),
        check_injection_patterns(text),
        check_sensitive_terms(text),
        check_bypass_intent(text),
    ]
    .into_iter()
    .flatten()
    .collect();

    ScreenReport::from_issues(issues)
}

/// Case-insensitive substring match against the role-hijack denylist.
pub fn check_forbidden_phrases(text: &str) -> Option<String> {
    let lowered = text.to_lowercase();
    let hits: Vec<&str> = FORBIDDEN_PHRASES
        .iter()
        .copied()
        .filter(|phrase| lowered.contains(phrase))
        .collect();
    describe("forbidden phrase", &hits)
}

/// Role-label spoofing and markup/script injection markers.
pub fn check_injection_patterns(text: &str) -> Option<String> {
    describe("prompt injection marker", &INJECTION.matches(text))
}

/// Credential-like vocabulary.
pub fn check_sensitive_terms(text: &str) -> Option<String> {
    describe("sensitive data term", &SENSITIVE.matches(text))
}

/// Override and exploit vocabulary.
pub fn check_bypass_intent(text: &str) -> Option<String> {
    describe("system bypass attempt", &BYPASS.matches(text))
}

fn describe(kind: &str, hits: &[&str]) -> Option<String> {
    if hits.is_empty() {
        None
    } else {
        Some(format!("{kind} detected: {}", hits.join(", ")))
    }
}

/// Length bounds for prompt text, counted in characters.
///
/// Kept apart from [`screen_prompt`] so a too-short prompt is reported for its
/// length alone.
pub fn check_prompt_length(text: &str) -> Option<String> {
    let chars = text.chars().count();
    if chars < MIN_PROMPT_CHARS {
        Some(format!(
            "prompt is too short ({chars} characters, minimum {MIN_PROMPT_CHARS})"
        ))
    } else if chars > MAX_PROMPT_CHARS {
        Some(format!(
            "prompt is too long ({chars} characters, maximum {MAX_PROMPT_CHARS})"
        ))
    } else {
        None
    }
}
