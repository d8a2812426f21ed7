//! Reconciliation report types.

use serde::{Deserialize, Serialize};

use super::status_map::RemoteStatus;
use crate::domain::{DocumentId, Platform};

/// How a local document was matched to a remote entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Exact `remote_id` equality. Authoritative.
    Id,

    /// Trimmed-title equality, first listing entry wins ties. Best-effort.
    Title,
}

/// Per-(document, platform) outcome of one reconciliation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMatch {
    pub document_id: DocumentId,
    pub title: String,
    pub platform: Platform,
    pub matched: bool,
    pub match_type: Option<MatchType>,
    pub remote_status: Option<RemoteStatus>,
    pub reject_reason: Option<String>,

    /// True when this pass altered the local publication status (or reset a
    /// dangling record to draft).
    pub changed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// (document, platform) pairs considered.
    pub total: usize,
    pub matched: usize,
    pub changed: usize,
    pub documents: Vec<DocumentMatch>,
}
