use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::Mutex;
use ulid::Ulid;

use super::*;
use crate::domain::{DocumentId, PublicationRecord, PublicationStatus, PublishConfig, PublishError};
use crate::ports::{FixedClock, PublishReceipt};
use crate::store::{InMemoryDocumentStore, InMemorySessionStore};

/// Client serving a fixed listing through real pagination.
struct ListingClient {
    platform: Platform,
    entries: Mutex<Vec<RemoteEntry>>,
    fail_on_page: Option<u32>,
    pages_fetched: AtomicU32,
}

impl ListingClient {
    fn new(platform: Platform, entries: Vec<RemoteEntry>) -> Arc<Self> {
        Arc::new(Self {
            platform,
            entries: Mutex::new(entries),
            fail_on_page: None,
            pages_fetched: AtomicU32::new(0),
        })
    }

    fn failing(platform: Platform, fail_on_page: u32) -> Arc<Self> {
        Arc::new(Self {
            platform,
            entries: Mutex::new(Vec::new()),
            fail_on_page: Some(fail_on_page),
            pages_fetched: AtomicU32::new(0),
        })
    }

    fn pages_fetched(&self) -> u32 {
        self.pages_fetched.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PlatformClient for ListingClient {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn publish(
        &self,
        _user: UserId,
        _document: &Document,
        _config: &PublishConfig,
    ) -> Result<PublishReceipt, PublishError> {
        Err(PublishError::Fatal("not a publishing client".to_string()))
    }

    async fn fetch_listing(
        &self,
        _user: UserId,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<RemoteEntry>, PublishError> {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
        if self.fail_on_page == Some(page) {
            return Err(PublishError::Retryable("listing returned 500".to_string()));
        }
        let entries = self.entries.lock().await;
        let start = ((page - 1) * page_size) as usize;
        let end = (start + page_size as usize).min(entries.len());
        if start >= entries.len() {
            return Ok(Vec::new());
        }
        Ok(entries[start..end].to_vec())
    }

    async fn check_session(&self, _user: UserId) -> Result<bool, PublishError> {
        Ok(true)
    }
}

fn entry(id: &str, title: &str, host: u8, sub: u8) -> RemoteEntry {
    RemoteEntry {
        id: id.to_string(),
        title: title.to_string(),
        url: format!("https://example.dev/{id}"),
        host_status: host,
        sub_status: sub,
        reject_reason: None,
    }
}

struct Fixture {
    engine: ReconciliationEngine,
    documents: InMemoryDocumentStore,
    user: UserId,
}

async fn fixture(client: Arc<ListingClient>) -> Fixture {
    fixture_with_config(client, ReconcileConfig::default()).await
}

async fn fixture_with_config(client: Arc<ListingClient>, config: ReconcileConfig) -> Fixture {
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
    ));
    let documents = InMemoryDocumentStore::new();
    let sessions = InMemorySessionStore::new();

    let user = UserId::from_ulid(Ulid::new());
    sessions.login(user, Platform::Devto).await;

    let mut registry = ClientRegistry::new();
    registry.register(client).unwrap();

    let engine = ReconciliationEngine::new(
        Arc::new(documents.clone()),
        Arc::new(sessions.clone()),
        Arc::new(registry),
        clock,
    )
    .with_config(config);

    Fixture {
        engine,
        documents,
        user,
    }
}

impl Fixture {
    async fn seed_document(&self, title: &str, record: Option<PublicationRecord>) -> DocumentId {
        let id = DocumentId::from_ulid(Ulid::new());
        let mut document = Document::new(id, self.user, title, "body");
        if let Some(record) = record {
            document.publications.insert(Platform::Devto, record);
        }
        self.documents.insert(document).await;
        id
    }

    async fn record(&self, id: DocumentId) -> PublicationRecord {
        self.documents
            .get(id)
            .await
            .unwrap()
            .unwrap()
            .publication(Platform::Devto)
    }
}

#[tokio::test]
async fn id_match_promotes_published_status() {
    let client = ListingClient::new(Platform::Devto, vec![entry("42", "My Post", 2, 2)]);
    let fx = fixture(client).await;
    let doc = fx
        .seed_document(
            "My Post",
            Some(PublicationRecord {
                remote_id: Some("42".to_string()),
                status: PublicationStatus::PendingReview,
                ..PublicationRecord::default()
            }),
        )
        .await;

    let report = fx.engine.reconcile(fx.user).await.unwrap();
    assert_eq!(report.total, 1);
    assert_eq!(report.matched, 1);
    assert_eq!(report.changed, 1);
    assert_eq!(report.documents[0].match_type, Some(MatchType::Id));
    assert_eq!(report.documents[0].remote_status, Some(RemoteStatus::Published));
    assert!(report.documents[0].changed);

    let record = fx.record(doc).await;
    assert_eq!(record.status, PublicationStatus::Published);
    assert_eq!(record.remote_url.as_deref(), Some("https://example.dev/42"));
    assert!(record.last_synced_at.is_some());
}

#[tokio::test]
async fn second_pass_changes_nothing() {
    let client = ListingClient::new(Platform::Devto, vec![entry("42", "My Post", 2, 2)]);
    let fx = fixture(client).await;
    fx.seed_document(
        "My Post",
        Some(PublicationRecord {
            remote_id: Some("42".to_string()),
            status: PublicationStatus::PendingReview,
            ..PublicationRecord::default()
        }),
    )
    .await;

    let first = fx.engine.reconcile(fx.user).await.unwrap();
    assert_eq!(first.changed, 1);

    let second = fx.engine.reconcile(fx.user).await.unwrap();
    assert_eq!(second.matched, 1);
    assert_eq!(second.changed, 0);
}

#[tokio::test]
async fn title_fallback_matches_and_links() {
    let client = ListingClient::new(Platform::Devto, vec![entry("77", "  My Post ", 2, 0)]);
    let fx = fixture(client).await;
    // Never published through the engine: no record at all.
    let doc = fx.seed_document("My Post", None).await;

    let report = fx.engine.reconcile(fx.user).await.unwrap();
    assert_eq!(report.documents[0].match_type, Some(MatchType::Title));
    assert_eq!(
        report.documents[0].remote_status,
        Some(RemoteStatus::PendingReview)
    );

    let record = fx.record(doc).await;
    assert_eq!(record.remote_id.as_deref(), Some("77"));
    assert_eq!(record.status, PublicationStatus::PendingReview);
}

#[tokio::test]
async fn duplicate_titles_break_ties_in_listing_order() {
    let client = ListingClient::new(
        Platform::Devto,
        vec![entry("first", "Dup", 2, 2), entry("second", "Dup", 3, 0)],
    );
    let fx = fixture(client).await;
    let doc = fx.seed_document("Dup", None).await;

    fx.engine.reconcile(fx.user).await.unwrap();

    let record = fx.record(doc).await;
    assert_eq!(record.remote_id.as_deref(), Some("first"));
    assert_eq!(record.status, PublicationStatus::Published);
}

#[tokio::test]
async fn id_match_beats_title_match() {
    let client = ListingClient::new(
        Platform::Devto,
        vec![entry("other", "My Post", 2, 2), entry("42", "Renamed remotely", 3, 0)],
    );
    let fx = fixture(client).await;
    let doc = fx
        .seed_document(
            "My Post",
            Some(PublicationRecord {
                remote_id: Some("42".to_string()),
                status: PublicationStatus::PendingReview,
                ..PublicationRecord::default()
            }),
        )
        .await;

    let report = fx.engine.reconcile(fx.user).await.unwrap();
    assert_eq!(report.documents[0].match_type, Some(MatchType::Id));

    let record = fx.record(doc).await;
    assert_eq!(record.remote_id.as_deref(), Some("42"));
    assert_eq!(record.status, PublicationStatus::Failed);
}

#[tokio::test]
async fn rejection_propagates_the_reason() {
    let mut rejected = entry("9", "My Post", 3, 0);
    rejected.reject_reason = Some("links to spam".to_string());
    let client = ListingClient::new(Platform::Devto, vec![rejected]);
    let fx = fixture(client).await;
    let doc = fx
        .seed_document(
            "My Post",
            Some(PublicationRecord {
                remote_id: Some("9".to_string()),
                status: PublicationStatus::PendingReview,
                ..PublicationRecord::default()
            }),
        )
        .await;

    let report = fx.engine.reconcile(fx.user).await.unwrap();
    assert_eq!(report.documents[0].remote_status, Some(RemoteStatus::Rejected));
    assert_eq!(
        report.documents[0].reject_reason.as_deref(),
        Some("links to spam")
    );

    let record = fx.record(doc).await;
    assert_eq!(record.status, PublicationStatus::Failed);
    assert_eq!(record.error_message.as_deref(), Some("links to spam"));
}

#[tokio::test]
async fn vanished_remote_entry_resets_to_draft() {
    let client = ListingClient::new(Platform::Devto, vec![]);
    let fx = fixture(client).await;
    let doc = fx
        .seed_document(
            "My Post",
            Some(PublicationRecord {
                remote_id: Some("gone".to_string()),
                remote_url: Some("https://example.dev/gone".to_string()),
                status: PublicationStatus::Published,
                ..PublicationRecord::default()
            }),
        )
        .await;

    let report = fx.engine.reconcile(fx.user).await.unwrap();
    assert_eq!(report.matched, 0);
    assert_eq!(report.changed, 1);
    assert!(!report.documents[0].matched);
    assert!(report.documents[0].changed);

    let record = fx.record(doc).await;
    assert_eq!(record.status, PublicationStatus::Draft);
    assert!(!record.has_remote_linkage());
    assert!(record.remote_url.is_none());

    // Second pass: nothing left to reset.
    let second = fx.engine.reconcile(fx.user).await.unwrap();
    assert_eq!(second.changed, 0);
}

#[tokio::test]
async fn unmatched_without_linkage_is_reported_untouched() {
    let client = ListingClient::new(Platform::Devto, vec![]);
    let fx = fixture(client).await;
    let doc = fx.seed_document("Never Published", None).await;

    let report = fx.engine.reconcile(fx.user).await.unwrap();
    assert_eq!(report.total, 1);
    assert_eq!(report.changed, 0);
    assert!(!report.documents[0].matched);
    assert!(!report.documents[0].changed);

    let record = fx.record(doc).await;
    assert_eq!(record.status, PublicationStatus::Draft);
}

#[tokio::test]
async fn pagination_drains_until_a_short_page() {
    let entries: Vec<RemoteEntry> = (0..5)
        .map(|i| entry(&format!("id-{i}"), &format!("Post {i}"), 2, 0))
        .collect();
    let client = ListingClient::new(Platform::Devto, entries);
    let fx = fixture_with_config(
        client.clone(),
        ReconcileConfig {
            page_size: 2,
            max_pages: 50,
        },
    )
    .await;
    let doc = fx.seed_document("Post 4", None).await;

    let report = fx.engine.reconcile(fx.user).await.unwrap();
    // Pages of 2, 2 and 1: the short third page ends the listing.
    assert_eq!(client.pages_fetched(), 3);
    assert_eq!(report.matched, 1);
    assert_eq!(fx.record(doc).await.remote_id.as_deref(), Some("id-4"));
}

#[tokio::test]
async fn pagination_stops_at_the_page_cap() {
    let entries: Vec<RemoteEntry> = (0..10)
        .map(|i| entry(&format!("id-{i}"), &format!("Post {i}"), 2, 0))
        .collect();
    let client = ListingClient::new(Platform::Devto, entries);
    let fx = fixture_with_config(
        client.clone(),
        ReconcileConfig {
            page_size: 2,
            max_pages: 3,
        },
    )
    .await;
    // Entry id-8 sits on page 5, beyond the cap.
    let doc = fx.seed_document("Post 8", None).await;

    let report = fx.engine.reconcile(fx.user).await.unwrap();
    assert_eq!(client.pages_fetched(), 3);
    assert_eq!(report.matched, 0);
    assert_eq!(fx.record(doc).await.status, PublicationStatus::Draft);
}

#[tokio::test]
async fn listing_failure_aborts_the_whole_run() {
    let client = ListingClient::failing(Platform::Devto, 1);
    let fx = fixture(client).await;
    let doc = fx
        .seed_document(
            "My Post",
            Some(PublicationRecord {
                remote_id: Some("42".to_string()),
                status: PublicationStatus::PendingReview,
                ..PublicationRecord::default()
            }),
        )
        .await;

    let result = fx.engine.reconcile(fx.user).await;
    assert!(matches!(
        result,
        Err(ReconcileError::Listing {
            platform: Platform::Devto,
            ..
        })
    ));

    // No partial merge happened.
    let record = fx.record(doc).await;
    assert_eq!(record.status, PublicationStatus::PendingReview);
    assert!(record.last_synced_at.is_none());
}

#[tokio::test]
async fn platforms_without_a_session_are_skipped() {
    // Only devto is logged in; the engine must not demand clients for the
    // other platforms.
    let client = ListingClient::new(Platform::Devto, vec![]);
    let fx = fixture(client).await;
    fx.seed_document("My Post", None).await;

    let report = fx.engine.reconcile(fx.user).await.unwrap();
    // One (document, platform) pair considered, not three.
    assert_eq!(report.total, 1);
}
