//! Document aggregate and per-platform publication records.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{DocumentId, UserId};
use super::platform::Platform;

/// Local view of a document's publication state on one platform.
///
/// Serialized names match the stored contract ("pendingReview" etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PublicationStatus {
    Draft,
    Scheduled,
    PendingReview,
    Published,
    Failed,
}

/// Per-platform publication record.
///
/// Mutated by exactly two components: the scheduler (on publish outcome) and
/// the reconciliation engine (on merge with the remote listing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationRecord {
    /// ID of the published post on the remote platform.
    pub remote_id: Option<String>,

    /// ID of a remote draft, when the platform created one before review.
    pub remote_draft_id: Option<String>,

    pub remote_url: Option<String>,

    pub status: PublicationStatus,

    /// Last time reconciliation confirmed this record against the remote.
    pub last_synced_at: Option<DateTime<Utc>>,

    pub error_message: Option<String>,
}

impl Default for PublicationRecord {
    fn default() -> Self {
        Self {
            remote_id: None,
            remote_draft_id: None,
            remote_url: None,
            status: PublicationStatus::Draft,
            last_synced_at: None,
            error_message: None,
        }
    }
}

impl PublicationRecord {
    /// Does this record still claim a remote counterpart?
    pub fn has_remote_linkage(&self) -> bool {
        self.remote_id.is_some() || self.remote_draft_id.is_some()
    }

    /// Reset to a plain local draft, clearing all remote linkage.
    ///
    /// Used when reconciliation finds the remote entry gone.
    pub fn reset_to_draft(&mut self, now: DateTime<Utc>) {
        self.remote_id = None;
        self.remote_draft_id = None;
        self.remote_url = None;
        self.status = PublicationStatus::Draft;
        self.last_synced_at = Some(now);
        self.error_message = None;
    }
}

/// An authored document. Editing and storage of the body live elsewhere;
/// this is the subset the publish engine reads and annotates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub user_id: UserId,
    pub title: String,
    pub body: String,

    /// Publication state per platform. Absent entry == never touched.
    #[serde(default)]
    pub publications: HashMap<Platform, PublicationRecord>,
}

impl Document {
    pub fn new(id: DocumentId, user_id: UserId, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id,
            user_id,
            title: title.into(),
            body: body.into(),
            publications: HashMap::new(),
        }
    }

    /// The publication record for `platform`, defaulting to an untouched draft.
    pub fn publication(&self, platform: Platform) -> PublicationRecord {
        self.publications.get(&platform).cloned().unwrap_or_default()
    }
}
