//! Demo binary: wires the engine with in-memory stores and a scripted
//! platform client, schedules a publish, watches it retry into success,
//! then reconciles against the remote listing.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::{Duration, sleep};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crosspost_core::app::{EngineConfig, EngineHandle};
use crosspost_core::domain::{Document, Platform, PublishConfig, PublishError, UserId};
use crosspost_core::monitor::LoginStatusMonitor;
use crosspost_core::ports::{
    ClientRegistry, Clock, FixedClock, IdGenerator, PlatformClient, PublishReceipt, RemoteEntry,
    SystemClock, TaskStore, UlidGenerator,
};
use crosspost_core::reconcile::ReconciliationEngine;
use crosspost_core::scheduler::TaskScheduler;
use crosspost_core::store::{
    InMemoryDocumentStore, InMemorySessionStore, InMemoryTaskStore, RecordingNotifier,
};

/// Demo client: fails the first N publish calls with a transient error,
/// then succeeds and appends the post to its own listing (already live,
/// so the reconciliation pass promotes the local record to published).
struct ScriptedClient {
    remaining_failures: AtomicU32,
    listing: Mutex<Vec<RemoteEntry>>,
}

impl ScriptedClient {
    fn new(failures: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(failures),
            listing: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PlatformClient for ScriptedClient {
    fn platform(&self) -> Platform {
        Platform::Devto
    }

    async fn publish(
        &self,
        _user: UserId,
        document: &Document,
        _config: &PublishConfig,
    ) -> Result<PublishReceipt, PublishError> {
        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(PublishError::Retryable(format!(
                "503 from platform (left={left})"
            )));
        }

        let mut listing = self.listing.lock().await;
        let remote_id = format!("{}", 1000 + listing.len());
        let remote_url = format!("https://dev.to/demo/{remote_id}");
        listing.push(RemoteEntry {
            id: remote_id.clone(),
            title: document.title.clone(),
            url: remote_url.clone(),
            host_status: 2,
            sub_status: 2,
            reject_reason: None,
        });
        Ok(PublishReceipt {
            remote_id,
            remote_url,
            raw_status: "published".to_string(),
        })
    }

    async fn fetch_listing(
        &self,
        _user: UserId,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<RemoteEntry>, PublishError> {
        let listing = self.listing.lock().await;
        let start = ((page - 1) * page_size) as usize;
        let end = (start + page_size as usize).min(listing.len());
        if start >= listing.len() {
            return Ok(Vec::new());
        }
        Ok(listing[start..end].to_vec())
    }

    async fn check_session(&self, _user: UserId) -> Result<bool, PublishError> {
        Ok(true)
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // (A) In-memory backends and a controllable clock.
    let clock = Arc::new(FixedClock::new(Utc::now()));
    let tasks = InMemoryTaskStore::new();
    let documents = InMemoryDocumentStore::new();
    let sessions = InMemorySessionStore::new();
    let notifier = RecordingNotifier::new();

    let ids = UlidGenerator::new(SystemClock);
    let user = ids.user_id();
    let document = Document::new(
        ids.document_id(),
        user,
        "Why the Borrow Checker Is Your Friend",
        "Full article body lives in the editing subsystem.",
    );
    let document_id = document.id;
    documents.insert(document).await;
    sessions.login(user, Platform::Devto).await;

    // (B) One scripted platform client: two transient failures, then success.
    let mut registry = ClientRegistry::new();
    registry
        .register(Arc::new(ScriptedClient::new(2)))
        .expect("fresh registry");
    let registry = Arc::new(registry);

    let scheduler = Arc::new(TaskScheduler::new(
        Arc::new(tasks.clone()),
        Arc::new(documents.clone()),
        Arc::new(sessions.clone()),
        registry.clone(),
        Arc::new(notifier.clone()),
        clock.clone(),
        Arc::new(UlidGenerator::new(SystemClock)),
    ));
    let monitor = Arc::new(LoginStatusMonitor::new(
        Arc::new(tasks.clone()),
        Arc::new(sessions.clone()),
        registry.clone(),
        Arc::new(notifier.clone()),
        clock.clone(),
    ));
    let reconciler = ReconciliationEngine::new(
        Arc::new(documents.clone()),
        Arc::new(sessions.clone()),
        registry,
        clock.clone(),
    );

    // (C) Schedule a publish an hour out.
    let task = scheduler
        .create_task(
            document_id,
            user,
            Platform::Devto,
            clock.now() + chrono::Duration::hours(1),
            PublishConfig::Devto {
                tags: vec!["rust".to_string(), "ownership".to_string()],
                series: None,
                canonical_url: Some("https://blog.example.com/borrow-checker".to_string()),
                publish_now: true,
            },
        )
        .await
        .expect("valid task");
    info!(task_id = %task.id, due = %task.scheduled_at, "task scheduled");
    println!("scheduled task {} (due {})", task.id, task.scheduled_at);

    // (D) Run the engine loops and drive the clock past the due time, then
    // past each retry, until the task reaches a terminal state.
    let handle = EngineHandle::spawn(
        scheduler.clone(),
        monitor,
        EngineConfig {
            tick_interval: Duration::from_millis(50),
            monitor_interval: Duration::from_millis(50),
        },
    );

    clock.advance(chrono::Duration::hours(2));
    loop {
        sleep(Duration::from_millis(100)).await;
        let current = tasks.get(task.id).await.expect("store ok").expect("task exists");
        println!(
            "task state: {:?} (retries {}/{}, last error: {:?})",
            current.status, current.retry_count, current.max_retries, current.error_message
        );
        if current.status.is_terminal() {
            println!("result url: {:?}", current.result_url);
            break;
        }
        // Jump over the backoff delay instead of waiting it out.
        clock.advance(chrono::Duration::minutes(11));
    }

    // (E) Reconcile against the remote listing: the scripted platform lists
    // the post as live, so the local record moves pendingReview -> published.
    let report = reconciler.reconcile(user).await.expect("reconcile ok");
    println!(
        "reconciled: {}/{} matched, {} changed",
        report.matched, report.total, report.changed
    );
    for doc in &report.documents {
        println!(
            "  {}",
            serde_json::to_string(doc).expect("report serializes")
        );
    }

    println!("notifications sent: {}", notifier.sent().await.len());
    handle.shutdown_and_join().await;
    info!("engine loops stopped, demo finished");
}
