//! Scheduled task record: one deferred publish attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{DocumentId, TaskId, UserId};
use super::platform::{Platform, PublishConfig};

/// Task status.
///
/// State transitions:
/// - Pending -> Running -> Success
/// - Pending -> Running -> Pending (retry with a new `scheduled_at`, until `max_retries`)
/// - Pending -> Running -> Failed
/// - Pending -> Cancelled (explicit user action, pending only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Success,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Success | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// Is this task still occupying its (document, platform) slot?
    ///
    /// At most one active task may exist per (document, platform) pair.
    pub fn is_active(self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Running)
    }
}

/// A durable record of one deferred publish attempt.
///
/// Design:
/// - This is the single source of truth for task state.
/// - All state transitions happen via methods, never by poking fields.
/// - The field set is the durable contract: stored state must survive a
///   reimplementation unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub id: TaskId,
    pub document_id: DocumentId,
    pub user_id: UserId,
    pub platform: Platform,
    pub config: PublishConfig,

    /// When this task becomes due. Moves forward on retry.
    pub scheduled_at: DateTime<Utc>,

    pub status: TaskStatus,

    /// Last error message (set on any failure path, cleared on success).
    pub error_message: Option<String>,

    /// When the successful publish call completed.
    pub executed_at: Option<DateTime<Utc>>,

    /// URL of the published post, from the platform's response.
    pub result_url: Option<String>,

    /// Retries consumed so far. Never exceeds `max_retries`.
    pub retry_count: u32,

    /// Retry budget, fixed at creation.
    pub max_retries: u32,

    /// Whether the terminal-transition notification has been sent.
    /// Transitions false -> true at most once, never resets.
    pub notified: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduledTask {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: TaskId,
        document_id: DocumentId,
        user_id: UserId,
        platform: Platform,
        config: PublishConfig,
        scheduled_at: DateTime<Utc>,
        max_retries: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            document_id,
            user_id,
            platform,
            config,
            scheduled_at,
            status: TaskStatus::Pending,
            error_message: None,
            executed_at: None,
            result_url: None,
            retry_count: 0,
            max_retries,
            notified: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark as picked up by the scheduler.
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.status = TaskStatus::Running;
        self.updated_at = now;
    }

    /// Mark as published.
    pub fn complete(&mut self, now: DateTime<Utc>, result_url: String) {
        self.status = TaskStatus::Success;
        self.executed_at = Some(now);
        self.result_url = Some(result_url);
        self.error_message = None;
        self.updated_at = now;
    }

    /// Mark as terminally failed.
    pub fn fail(&mut self, now: DateTime<Utc>, error: String) {
        self.status = TaskStatus::Failed;
        self.error_message = Some(error);
        self.updated_at = now;
    }

    /// Re-queue for a later attempt. Consumes one retry.
    pub fn schedule_retry(&mut self, next_due: DateTime<Utc>, error: String, now: DateTime<Utc>) {
        self.status = TaskStatus::Pending;
        self.scheduled_at = next_due;
        self.retry_count += 1;
        self.error_message = Some(error);
        self.updated_at = now;
    }

    /// Cancel. Only valid while pending; the caller checks the state.
    pub fn cancel(&mut self, now: DateTime<Utc>) {
        self.status = TaskStatus::Cancelled;
        self.updated_at = now;
    }

    /// Record that the terminal notification went out.
    pub fn mark_notified(&mut self, now: DateTime<Utc>) {
        self.notified = true;
        self.updated_at = now;
    }

    /// Move the due time (user edit of a pending task, not a retry).
    pub fn reschedule(&mut self, scheduled_at: DateTime<Utc>, now: DateTime<Utc>) {
        self.scheduled_at = scheduled_at;
        self.updated_at = now;
    }

    /// Swap the publish config (user edit of a pending task).
    pub fn replace_config(&mut self, config: PublishConfig, now: DateTime<Utc>) {
        self.config = config;
        self.updated_at = now;
    }

    /// Is there retry budget left?
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }
}
