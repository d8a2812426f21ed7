//! TaskScheduler: the public scheduling surface and the tick execution pass.
//!
//! The scheduler owns due-task selection, execution, retry/backoff, and
//! exactly-once notification per terminal transition. Scheduling-time errors
//! are returned to the caller; execution-time errors are captured on the
//! task record and never escape the tick.

mod backoff;
mod classify;

pub use backoff::{Backoff, ExponentialBackoff, FixedBackoff};
pub use classify::{DefaultClassifier, FailureClassifier};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{
    DocumentId, FailureClass, NotificationKind, Platform, PublicationStatus, PublishConfig,
    ScheduleError, ScheduledTask, TaskId, TaskStatus, UserId,
};
use crate::ports::{
    ClientRegistry, Clock, DocumentStore, IdGenerator, Notifier, SessionStore, TaskStore,
};

/// Default retry budget for new tasks.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Outcome summary of one tick, for logging and observability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickReport {
    /// True when the tick was skipped because the previous one was still
    /// executing (single-flight guard).
    pub skipped: bool,
    pub executed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub retried: usize,
}

impl TickReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

enum RunOutcome {
    Succeeded,
    Failed,
    Retried,
}

/// Resets the single-flight flag even if a tick panics.
struct TickGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct TaskScheduler {
    tasks: Arc<dyn TaskStore>,
    documents: Arc<dyn DocumentStore>,
    sessions: Arc<dyn SessionStore>,
    clients: Arc<ClientRegistry>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    classifier: Arc<dyn FailureClassifier>,
    backoff: Arc<dyn Backoff>,
    max_retries: u32,

    /// Single-flight guard owned by this instance, so multiple schedulers
    /// can coexist (in tests or otherwise) without shared global state.
    ticking: AtomicBool,
}

impl TaskScheduler {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        documents: Arc<dyn DocumentStore>,
        sessions: Arc<dyn SessionStore>,
        clients: Arc<ClientRegistry>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            tasks,
            documents,
            sessions,
            clients,
            notifier,
            clock,
            ids,
            classifier: Arc::new(DefaultClassifier),
            backoff: Arc::new(FixedBackoff::default()),
            max_retries: DEFAULT_MAX_RETRIES,
            ticking: AtomicBool::new(false),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn FailureClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_backoff(mut self, backoff: Arc<dyn Backoff>) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    // ------------------------------------------------------------------
    // Public scheduling surface
    // ------------------------------------------------------------------

    /// Schedule a deferred publish.
    ///
    /// Rejects a due time in the past, a config for the wrong platform, and
    /// a second active task for the same (document, platform) pair.
    pub async fn create_task(
        &self,
        document_id: DocumentId,
        user_id: UserId,
        platform: Platform,
        scheduled_at: DateTime<Utc>,
        config: PublishConfig,
    ) -> Result<ScheduledTask, ScheduleError> {
        if config.platform() != platform {
            return Err(ScheduleError::Validation(format!(
                "config is for {}, task targets {}",
                config.platform(),
                platform
            )));
        }

        let now = self.clock.now();
        if scheduled_at <= now {
            return Err(ScheduleError::Validation(
                "scheduled_at must be in the future".to_string(),
            ));
        }

        let document = self
            .documents
            .get(document_id)
            .await?
            .filter(|d| d.user_id == user_id)
            .ok_or_else(|| ScheduleError::NotFound(format!("document {document_id}")))?;

        if let Some(existing) = self.tasks.active_for(document_id, platform).await? {
            return Err(ScheduleError::Validation(format!(
                "document already has an active task for {} (task {}, {:?})",
                platform, existing.id, existing.status
            )));
        }

        let task = ScheduledTask::new(
            self.ids.task_id(),
            document_id,
            user_id,
            platform,
            config,
            scheduled_at,
            self.max_retries,
            now,
        );
        self.tasks.insert(task.clone()).await?;

        let mut record = document.publication(platform);
        record.status = PublicationStatus::Scheduled;
        self.documents
            .update_publication(document_id, platform, record)
            .await?;

        info!(task_id = %task.id, document_id = %document_id, platform = %platform,
              scheduled_at = %scheduled_at, "task scheduled");
        Ok(task)
    }

    /// Cancel a pending task. Running tasks cannot be cancelled: once
    /// dispatched, the publish call runs to completion.
    pub async fn cancel_task(&self, task_id: TaskId, user_id: UserId) -> Result<(), ScheduleError> {
        let mut task = self.owned_task(task_id, user_id).await?;
        if task.status != TaskStatus::Pending {
            return Err(ScheduleError::InvalidState(format!(
                "task {task_id} is {:?}, only pending tasks can be cancelled",
                task.status
            )));
        }

        let now = self.clock.now();
        task.cancel(now);
        self.tasks.update(&task).await?;

        // Put the publication record back to draft if scheduling was the
        // only thing that had touched it.
        if let Some(document) = self.documents.get(task.document_id).await? {
            let mut record = document.publication(task.platform);
            if record.status == PublicationStatus::Scheduled {
                record.status = PublicationStatus::Draft;
                self.documents
                    .update_publication(task.document_id, task.platform, record)
                    .await?;
            }
        }

        info!(task_id = %task_id, "task cancelled");
        Ok(())
    }

    /// Edit a pending task's due time and/or config.
    pub async fn update_task(
        &self,
        task_id: TaskId,
        user_id: UserId,
        scheduled_at: Option<DateTime<Utc>>,
        config: Option<PublishConfig>,
    ) -> Result<ScheduledTask, ScheduleError> {
        let mut task = self.owned_task(task_id, user_id).await?;
        if task.status != TaskStatus::Pending {
            return Err(ScheduleError::InvalidState(format!(
                "task {task_id} is {:?}, only pending tasks can be updated",
                task.status
            )));
        }

        let now = self.clock.now();
        if let Some(at) = scheduled_at {
            if at <= now {
                return Err(ScheduleError::Validation(
                    "scheduled_at must be in the future".to_string(),
                ));
            }
            task.reschedule(at, now);
        }
        if let Some(config) = config {
            if config.platform() != task.platform {
                return Err(ScheduleError::Validation(format!(
                    "config is for {}, task targets {}",
                    config.platform(),
                    task.platform
                )));
            }
            task.replace_config(config, now);
        }

        self.tasks.update(&task).await?;
        Ok(task)
    }

    pub async fn list_tasks(
        &self,
        user_id: UserId,
        status: Option<TaskStatus>,
    ) -> Result<Vec<ScheduledTask>, ScheduleError> {
        Ok(self.tasks.list_by_user(user_id, status).await?)
    }

    async fn owned_task(
        &self,
        task_id: TaskId,
        user_id: UserId,
    ) -> Result<ScheduledTask, ScheduleError> {
        self.tasks
            .get(task_id)
            .await?
            .filter(|t| t.user_id == user_id)
            .ok_or_else(|| ScheduleError::NotFound(format!("task {task_id}")))
    }

    // ------------------------------------------------------------------
    // Tick execution
    // ------------------------------------------------------------------

    /// Execute one scheduling pass: pick up every due pending task and run
    /// them sequentially, earliest-due-first.
    ///
    /// If a previous tick is still executing the pass is skipped entirely,
    /// never queued. Only storage failures escape; publish failures are
    /// captured on the task records.
    pub async fn tick(&self) -> Result<TickReport, ScheduleError> {
        if self
            .ticking
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("previous tick still executing, skipping");
            return Ok(TickReport::skipped());
        }
        let _guard = TickGuard {
            flag: &self.ticking,
        };

        let now = self.clock.now();
        let due = self.tasks.due_before(now).await?;

        let mut report = TickReport::default();
        for task in due {
            report.executed += 1;
            match self.run_one(task).await? {
                RunOutcome::Succeeded => report.succeeded += 1,
                RunOutcome::Failed => report.failed += 1,
                RunOutcome::Retried => report.retried += 1,
            }
        }
        Ok(report)
    }

    async fn run_one(&self, mut task: ScheduledTask) -> Result<RunOutcome, ScheduleError> {
        let now = self.clock.now();
        task.start(now);
        self.tasks.update(&task).await?;
        debug!(task_id = %task.id, platform = %task.platform, "executing publish task");

        // Local session pre-check: without a valid cached session the
        // network call is pointless and the failure class is already known.
        if !self.sessions.is_valid(task.user_id, task.platform).await? {
            return self
                .finish_failure(
                    task,
                    FailureClass::SessionExpired,
                    "no valid cached session".to_string(),
                )
                .await;
        }

        let Some(client) = self.clients.get(task.platform) else {
            let message = format!("no client registered for {}", task.platform);
            return self
                .finish_failure(task, FailureClass::Fatal, message)
                .await;
        };

        let Some(document) = self.documents.get(task.document_id).await? else {
            let message = format!("document {} no longer exists", task.document_id);
            return self
                .finish_failure(task, FailureClass::Fatal, message)
                .await;
        };

        match client.publish(task.user_id, &document, &task.config).await {
            Ok(receipt) => {
                let now = self.clock.now();
                task.complete(now, receipt.remote_url.clone());
                self.tasks.update(&task).await?;

                // Publication write-back. These platforms moderate, so the
                // local status is pendingReview until reconciliation
                // confirms the post went live.
                let mut record = document.publication(task.platform);
                record.remote_id = Some(receipt.remote_id.clone());
                record.remote_url = Some(receipt.remote_url.clone());
                record.status = PublicationStatus::PendingReview;
                record.error_message = None;
                self.documents
                    .update_publication(task.document_id, task.platform, record)
                    .await?;

                info!(task_id = %task.id, remote_id = %receipt.remote_id,
                      url = %receipt.remote_url, "publish succeeded");
                let payload = serde_json::json!({
                    "task_id": task.id.to_string(),
                    "document_id": task.document_id.to_string(),
                    "platform": task.platform,
                    "result_url": receipt.remote_url,
                });
                self.notify_terminal(&mut task, NotificationKind::PublishSucceeded, payload)
                    .await?;
                Ok(RunOutcome::Succeeded)
            }
            Err(error) => {
                let class = self.classifier.classify(&error);
                if class == FailureClass::Retryable && task.can_retry() {
                    let now = self.clock.now();
                    let next_due = now + self.backoff.next_delay(task.retry_count);
                    task.schedule_retry(next_due, error.to_string(), now);
                    self.tasks.update(&task).await?;
                    warn!(task_id = %task.id, retry_count = task.retry_count,
                          next_due = %next_due, error = %error, "publish failed, retry scheduled");
                    Ok(RunOutcome::Retried)
                } else {
                    self.finish_failure(task, class, error.to_string()).await
                }
            }
        }
    }

    async fn finish_failure(
        &self,
        mut task: ScheduledTask,
        class: FailureClass,
        message: String,
    ) -> Result<RunOutcome, ScheduleError> {
        let now = self.clock.now();
        task.fail(now, message.clone());
        self.tasks.update(&task).await?;
        warn!(task_id = %task.id, platform = %task.platform, ?class, error = %message,
              "publish failed terminally");

        if let Some(document) = self.documents.get(task.document_id).await? {
            let mut record = document.publication(task.platform);
            record.status = PublicationStatus::Failed;
            record.error_message = Some(message.clone());
            self.documents
                .update_publication(task.document_id, task.platform, record)
                .await?;
        }

        let kind = match class {
            FailureClass::SessionExpired => NotificationKind::SessionExpired,
            _ => NotificationKind::PublishFailed,
        };
        let payload = serde_json::json!({
            "task_id": task.id.to_string(),
            "document_id": task.document_id.to_string(),
            "platform": task.platform,
            "error": message,
            "retry_count": task.retry_count,
            "max_retries": task.max_retries,
        });
        self.notify_terminal(&mut task, kind, payload).await?;
        Ok(RunOutcome::Failed)
    }

    /// At most one notification per terminal transition: the `notified` flag
    /// is persisted before the gateway call, so a gateway failure may drop a
    /// notice but can never duplicate one.
    async fn notify_terminal(
        &self,
        task: &mut ScheduledTask,
        kind: NotificationKind,
        payload: serde_json::Value,
    ) -> Result<(), ScheduleError> {
        if !task.status.is_terminal() || task.notified {
            return Ok(());
        }
        task.mark_notified(self.clock.now());
        self.tasks.update(task).await?;

        if let Err(error) = self.notifier.notify(task.user_id, kind, payload).await {
            warn!(task_id = %task.id, %error, "notification delivery failed");
        }
        Ok(())
    }
}
