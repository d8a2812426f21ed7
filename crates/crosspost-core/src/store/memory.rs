//! In-memory implementations of the storage ports.
//!
//! Development and test backends. Each store keeps its state behind an
//! `Arc<Mutex<_>>` so clones share one underlying map; no lock is held
//! across an await.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{
    Document, DocumentId, Notification, NotificationKind, NotifyError, Platform,
    PublicationRecord, ScheduledTask, StoreError, TaskId, TaskStatus, UserId,
};
use crate::ports::{DocumentStore, Notifier, SessionStore, TaskStore};

/// In-memory task store.
#[derive(Default, Clone)]
pub struct InMemoryTaskStore {
    tasks: Arc<Mutex<HashMap<TaskId, ScheduledTask>>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert(&self, task: ScheduledTask) -> Result<(), StoreError> {
        let mut tasks = self.tasks.lock().await;
        tasks.insert(task.id, task);
        Ok(())
    }

    async fn get(&self, id: TaskId) -> Result<Option<ScheduledTask>, StoreError> {
        let tasks = self.tasks.lock().await;
        Ok(tasks.get(&id).cloned())
    }

    async fn update(&self, task: &ScheduledTask) -> Result<(), StoreError> {
        let mut tasks = self.tasks.lock().await;
        if !tasks.contains_key(&task.id) {
            return Err(StoreError(format!("task {} not found", task.id)));
        }
        tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn due_before(&self, until: DateTime<Utc>) -> Result<Vec<ScheduledTask>, StoreError> {
        let tasks = self.tasks.lock().await;
        let mut due: Vec<ScheduledTask> = tasks
            .values()
            .filter(|t| t.status == TaskStatus::Pending && t.scheduled_at <= until)
            .cloned()
            .collect();
        due.sort_by_key(|t| (t.scheduled_at, t.id));
        Ok(due)
    }

    async fn active_for(
        &self,
        document: DocumentId,
        platform: Platform,
    ) -> Result<Option<ScheduledTask>, StoreError> {
        let tasks = self.tasks.lock().await;
        Ok(tasks
            .values()
            .find(|t| t.document_id == document && t.platform == platform && t.status.is_active())
            .cloned())
    }

    async fn list_by_user(
        &self,
        user: UserId,
        status: Option<TaskStatus>,
    ) -> Result<Vec<ScheduledTask>, StoreError> {
        let tasks = self.tasks.lock().await;
        let mut listed: Vec<ScheduledTask> = tasks
            .values()
            .filter(|t| t.user_id == user && status.is_none_or(|s| t.status == s))
            .cloned()
            .collect();
        listed.sort_by_key(|t| (t.scheduled_at, t.id));
        Ok(listed)
    }
}

/// In-memory document store.
#[derive(Default, Clone)]
pub struct InMemoryDocumentStore {
    documents: Arc<Mutex<HashMap<DocumentId, Document>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document (test/demo setup; real document creation lives in
    /// the editing subsystem).
    pub async fn insert(&self, document: Document) {
        let mut documents = self.documents.lock().await;
        documents.insert(document.id, document);
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, id: DocumentId) -> Result<Option<Document>, StoreError> {
        let documents = self.documents.lock().await;
        Ok(documents.get(&id).cloned())
    }

    async fn list_by_user(&self, user: UserId) -> Result<Vec<Document>, StoreError> {
        let documents = self.documents.lock().await;
        let mut listed: Vec<Document> = documents
            .values()
            .filter(|d| d.user_id == user)
            .cloned()
            .collect();
        listed.sort_by_key(|d| d.id);
        Ok(listed)
    }

    async fn update_publication(
        &self,
        document: DocumentId,
        platform: Platform,
        record: PublicationRecord,
    ) -> Result<(), StoreError> {
        let mut documents = self.documents.lock().await;
        let doc = documents
            .get_mut(&document)
            .ok_or_else(|| StoreError(format!("document {document} not found")))?;
        doc.publications.insert(platform, record);
        Ok(())
    }
}

/// In-memory session-validity cache.
#[derive(Default, Clone)]
pub struct InMemorySessionStore {
    valid: Arc<Mutex<HashSet<(UserId, Platform)>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a (user, platform) pair as logged in (test/demo setup; real
    /// session acquisition is a separate flow).
    pub async fn login(&self, user: UserId, platform: Platform) {
        let mut valid = self.valid.lock().await;
        valid.insert((user, platform));
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn is_valid(&self, user: UserId, platform: Platform) -> Result<bool, StoreError> {
        let valid = self.valid.lock().await;
        Ok(valid.contains(&(user, platform)))
    }

    async fn invalidate(&self, user: UserId, platform: Platform) -> Result<(), StoreError> {
        let mut valid = self.valid.lock().await;
        valid.remove(&(user, platform));
        Ok(())
    }

    async fn active_pairs(&self) -> Result<Vec<(UserId, Platform)>, StoreError> {
        let valid = self.valid.lock().await;
        let mut pairs: Vec<(UserId, Platform)> = valid.iter().copied().collect();
        pairs.sort();
        Ok(pairs)
    }
}

/// Notifier that records everything it is asked to send.
///
/// Doubles as the demo gateway and as the assertion point in tests.
#[derive(Default, Clone)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Notification> {
        let sent = self.sent.lock().await;
        sent.clone()
    }

    pub async fn sent_of_kind(&self, kind: NotificationKind) -> Vec<Notification> {
        let sent = self.sent.lock().await;
        sent.iter().filter(|n| n.kind == kind).cloned().collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        user: UserId,
        kind: NotificationKind,
        payload: serde_json::Value,
    ) -> Result<(), NotifyError> {
        let mut sent = self.sent.lock().await;
        sent.push(Notification::new(user, kind, payload));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PublishConfig;
    use chrono::TimeZone;
    use ulid::Ulid;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn task_due_at(due: DateTime<Utc>) -> ScheduledTask {
        ScheduledTask::new(
            TaskId::from_ulid(Ulid::new()),
            DocumentId::from_ulid(Ulid::new()),
            UserId::from_ulid(Ulid::new()),
            Platform::Devto,
            PublishConfig::Devto {
                tags: vec![],
                series: None,
                canonical_url: None,
                publish_now: true,
            },
            due,
            3,
            t0(),
        )
    }

    #[tokio::test]
    async fn due_before_filters_and_sorts() {
        let store = InMemoryTaskStore::new();
        let now = t0();

        let late = task_due_at(now + chrono::Duration::hours(1));
        let early = task_due_at(now - chrono::Duration::hours(2));
        let mid = task_due_at(now - chrono::Duration::hours(1));
        let mut done = task_due_at(now - chrono::Duration::hours(3));
        done.start(now);
        done.complete(now, "https://x".to_string());

        for t in [&late, &early, &mid, &done] {
            store.insert(t.clone()).await.unwrap();
        }

        let due = store.due_before(now).await.unwrap();
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].id, early.id);
        assert_eq!(due[1].id, mid.id);
    }

    #[tokio::test]
    async fn active_for_sees_pending_and_running_only() {
        let store = InMemoryTaskStore::new();
        let now = t0();

        let mut task = task_due_at(now);
        store.insert(task.clone()).await.unwrap();
        assert!(
            store
                .active_for(task.document_id, Platform::Devto)
                .await
                .unwrap()
                .is_some()
        );
        // The other platform's slot stays free.
        assert!(
            store
                .active_for(task.document_id, Platform::Medium)
                .await
                .unwrap()
                .is_none()
        );

        task.cancel(now);
        store.update(&task).await.unwrap();
        assert!(
            store
                .active_for(task.document_id, Platform::Devto)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn horizon_queries_include_overdue_tasks() {
        let store = InMemoryTaskStore::new();
        let now = t0();

        // Still pending though its due time already passed (retry waiting
        // for the next tick).
        let overdue = task_due_at(now - chrono::Duration::minutes(5));
        let inside = task_due_at(now + chrono::Duration::hours(2));
        let outside = task_due_at(now + chrono::Duration::hours(30));
        for t in [&overdue, &inside, &outside] {
            store.insert(t.clone()).await.unwrap();
        }

        let horizon = store
            .due_before(now + chrono::Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(horizon.len(), 2);
        assert_eq!(horizon[0].id, overdue.id);
        assert_eq!(horizon[1].id, inside.id);
    }

    #[tokio::test]
    async fn update_requires_existing_task() {
        let store = InMemoryTaskStore::new();
        let task = task_due_at(t0());
        assert!(store.update(&task).await.is_err());
    }

    #[tokio::test]
    async fn session_store_roundtrip() {
        let sessions = InMemorySessionStore::new();
        let user = UserId::from_ulid(Ulid::new());

        sessions.login(user, Platform::Devto).await;
        assert!(sessions.is_valid(user, Platform::Devto).await.unwrap());
        assert!(!sessions.is_valid(user, Platform::Medium).await.unwrap());

        sessions.invalidate(user, Platform::Devto).await.unwrap();
        assert!(!sessions.is_valid(user, Platform::Devto).await.unwrap());
        assert!(sessions.active_pairs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_publication_errors_on_missing_document() {
        let docs = InMemoryDocumentStore::new();
        let result = docs
            .update_publication(
                DocumentId::from_ulid(Ulid::new()),
                Platform::Devto,
                PublicationRecord::default(),
            )
            .await;
        assert!(result.is_err());
    }
}
