//! ReconciliationEngine: merge local publication records with the remote
//! platform's authoritative listing.
//!
//! Runs on demand, never on a timer. One pass fetches the listing through
//! bounded pagination, matches every local document against it (by remote ID,
//! falling back to title), writes the derived status back, and reports what
//! changed. Any listing or store failure aborts the whole run.

mod report;
mod status_map;

pub use report::{DocumentMatch, MatchType, ReconciliationReport};
pub use status_map::RemoteStatus;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::{Document, Platform, ReconcileError, UserId};
use crate::ports::{ClientRegistry, Clock, DocumentStore, PlatformClient, RemoteEntry, SessionStore};

#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Entries requested per listing page.
    pub page_size: u32,

    /// Hard cap on pages fetched per platform. Once hit, the pass runs on
    /// whatever was fetched.
    pub max_pages: u32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            max_pages: 50,
        }
    }
}

pub struct ReconciliationEngine {
    documents: Arc<dyn DocumentStore>,
    sessions: Arc<dyn SessionStore>,
    clients: Arc<ClientRegistry>,
    clock: Arc<dyn Clock>,
    config: ReconcileConfig,
}

impl ReconciliationEngine {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        sessions: Arc<dyn SessionStore>,
        clients: Arc<ClientRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            documents,
            sessions,
            clients,
            clock,
            config: ReconcileConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ReconcileConfig) -> Self {
        self.config = config;
        self
    }

    /// Reconcile all of `user`'s documents against every platform the user
    /// is currently logged into.
    ///
    /// Single-pass, two-sided diff over eventually-consistent state: a
    /// remote write landing mid-pass may be missed until the next run.
    pub async fn reconcile(&self, user: UserId) -> Result<ReconciliationReport, ReconcileError> {
        let documents = self.documents.list_by_user(user).await?;
        let mut report = ReconciliationReport::default();

        for platform in Platform::ALL {
            if !self.sessions.is_valid(user, platform).await? {
                debug!(user_id = %user, %platform, "no valid session, skipping platform");
                continue;
            }
            let client = self
                .clients
                .get(platform)
                .ok_or(ReconcileError::NoClient(platform))?;

            let listing = self.fetch_full_listing(client.as_ref(), user, platform).await?;
            self.merge_platform(platform, &documents, &listing, &mut report)
                .await?;
        }

        info!(user_id = %user, total = report.total, matched = report.matched,
              changed = report.changed, "reconciliation finished");
        Ok(report)
    }

    /// Drain the paginated listing, up to the page cap. A short page signals
    /// the end of the listing.
    async fn fetch_full_listing(
        &self,
        client: &dyn PlatformClient,
        user: UserId,
        platform: Platform,
    ) -> Result<Vec<RemoteEntry>, ReconcileError> {
        let mut entries = Vec::new();
        for page in 1..=self.config.max_pages {
            let batch = client
                .fetch_listing(user, page, self.config.page_size)
                .await
                .map_err(|source| ReconcileError::Listing { platform, source })?;
            let short_page = (batch.len() as u32) < self.config.page_size;
            entries.extend(batch);
            if short_page {
                return Ok(entries);
            }
        }
        warn!(%platform, pages = self.config.max_pages,
              "listing page cap reached, reconciling what was fetched");
        Ok(entries)
    }

    async fn merge_platform(
        &self,
        platform: Platform,
        documents: &[Document],
        listing: &[RemoteEntry],
        report: &mut ReconciliationReport,
    ) -> Result<(), ReconcileError> {
        let now = self.clock.now();

        for document in documents {
            report.total += 1;
            let mut record = document.publication(platform);
            let prior_status = record.status;

            // Primary match on remote ID, authoritative. Fallback on
            // trimmed title, best-effort: under duplicate titles the first
            // listing entry wins, a documented limitation.
            let mut match_type = None;
            let mut entry = None;
            if let Some(remote_id) = &record.remote_id {
                entry = listing.iter().find(|e| &e.id == remote_id);
                if entry.is_some() {
                    match_type = Some(MatchType::Id);
                }
            }
            if entry.is_none() {
                entry = listing
                    .iter()
                    .find(|e| e.title.trim() == document.title.trim());
                if entry.is_some() {
                    match_type = Some(MatchType::Title);
                }
            }

            match entry {
                Some(entry) => {
                    let remote_status =
                        RemoteStatus::from_parts(entry.host_status, entry.sub_status);
                    let new_status = remote_status.to_publication_status();
                    let changed = prior_status != new_status;

                    record.remote_id = Some(entry.id.clone());
                    record.remote_url = Some(entry.url.clone());
                    record.status = new_status;
                    record.last_synced_at = Some(now);
                    record.error_message = match remote_status {
                        RemoteStatus::Rejected => Some(
                            entry
                                .reject_reason
                                .clone()
                                .unwrap_or_else(|| "rejected".to_string()),
                        ),
                        RemoteStatus::Recycled => Some("recycled".to_string()),
                        _ => None,
                    };
                    self.documents
                        .update_publication(document.id, platform, record)
                        .await?;

                    report.matched += 1;
                    if changed {
                        report.changed += 1;
                    }
                    report.documents.push(DocumentMatch {
                        document_id: document.id,
                        title: document.title.clone(),
                        platform,
                        matched: true,
                        match_type,
                        remote_status: Some(remote_status),
                        reject_reason: entry.reject_reason.clone(),
                        changed,
                    });
                }
                None => {
                    // A dangling record means the remote entry was deleted
                    // or withdrawn: back to a plain local draft.
                    let changed = record.has_remote_linkage();
                    if changed {
                        record.reset_to_draft(now);
                        self.documents
                            .update_publication(document.id, platform, record)
                            .await?;
                        report.changed += 1;
                    }
                    report.documents.push(DocumentMatch {
                        document_id: document.id,
                        title: document.title.clone(),
                        platform,
                        matched: false,
                        match_type: None,
                        remote_status: None,
                        reject_reason: None,
                        changed,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
