//! Profile types: named system prompts plus their metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a profile came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProfileOrigin {
    /// Shipped with the binary, present from process start.
    BuiltIn,
    /// Registered at runtime; lives until the process exits.
    Custom,
}

/// A behavior profile: a system prompt that configures the generator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub prompt: String,
    pub origin: ProfileOrigin,
}

impl Profile {
    pub fn is_custom(&self) -> bool {
        self.origin == ProfileOrigin::Custom
    }

    /// Metadata view without the prompt body.
    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            version: self.version.clone(),
            custom: self.is_custom(),
        }
    }
}

/// Listing entry for a profile; omits the prompt text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub custom: bool,
}

/// A registration request for a custom profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// One entry in the profile-switch log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileTransition {
    pub from: String,
    pub to: String,
    pub timestamp: DateTime<Utc>,
}
