//! Decoding of the remote two-part status encoding.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::PublicationStatus;

/// Canonical reading of a remote entry's `(host_status, sub_status)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStatus {
    /// Live on the platform.
    Published,

    /// Accepted but still in the moderation queue.
    PendingReview,

    /// Rejected by moderation; the entry carries the reason.
    Rejected,

    /// Withdrawn into the platform's recycle bin.
    Recycled,
}

impl RemoteStatus {
    /// The lookup table. Unknown encodings read as still-in-review rather
    /// than failed, so a platform-side extension never flips documents to
    /// `failed` spuriously.
    pub fn from_parts(host_status: u8, sub_status: u8) -> Self {
        match (host_status, sub_status) {
            (2, 2) => RemoteStatus::Published,
            (2, _) => RemoteStatus::PendingReview,
            (3, _) => RemoteStatus::Rejected,
            (4, _) => RemoteStatus::Recycled,
            _ => RemoteStatus::PendingReview,
        }
    }

    /// The local publication status this remote state maps to.
    pub fn to_publication_status(self) -> PublicationStatus {
        match self {
            RemoteStatus::Published => PublicationStatus::Published,
            RemoteStatus::PendingReview => PublicationStatus::PendingReview,
            RemoteStatus::Rejected | RemoteStatus::Recycled => PublicationStatus::Failed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteStatus::Published => "published",
            RemoteStatus::PendingReview => "pending_review",
            RemoteStatus::Rejected => "rejected",
            RemoteStatus::Recycled => "recycled",
        }
    }
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
