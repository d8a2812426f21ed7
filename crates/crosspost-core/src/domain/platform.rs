//! Target platforms and their publish configurations.
//!
//! Each platform's publish call needs a different set of fields, so the
//! config is a sum type tagged by platform rather than a shared struct with
//! optional everything.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of platforms we republish to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Devto,
    Medium,
    Hashnode,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Devto, Platform::Medium, Platform::Hashnode];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Devto => "devto",
            Platform::Medium => "medium",
            Platform::Hashnode => "hashnode",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Platform-specific publish configuration.
///
/// Serialized with the platform as the tag, so a stored config always
/// round-trips to the same variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "platform", rename_all = "snake_case")]
pub enum PublishConfig {
    Devto {
        tags: Vec<String>,
        series: Option<String>,
        /// Canonical URL pointing back at the original post.
        canonical_url: Option<String>,
        /// Publish immediately instead of creating a draft.
        publish_now: bool,
    },
    Medium {
        tags: Vec<String>,
        /// "public", "draft" or "unlisted" (Medium's own vocabulary).
        publish_status: String,
        notify_followers: bool,
    },
    Hashnode {
        tags: Vec<String>,
        publication_id: String,
        subtitle: Option<String>,
        /// Marks the post as original content rather than a crosspost.
        original: bool,
    },
}

impl PublishConfig {
    /// The platform this config belongs to (must agree with the task's
    /// `platform` field; `create_task` validates this).
    pub fn platform(&self) -> Platform {
        match self {
            PublishConfig::Devto { .. } => Platform::Devto,
            PublishConfig::Medium { .. } => Platform::Medium,
            PublishConfig::Hashnode { .. } => Platform::Hashnode,
        }
    }
}
