//! TaskStore port - durable repository of scheduled-task records.
//!
//! The store is the source of truth for task state; every transition the
//! scheduler makes is persisted through it. Pure storage: query and update
//! contracts only, no behavior.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{DocumentId, Platform, ScheduledTask, StoreError, TaskId, TaskStatus, UserId};

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert(&self, task: ScheduledTask) -> Result<(), StoreError>;

    async fn get(&self, id: TaskId) -> Result<Option<ScheduledTask>, StoreError>;

    /// Persist the current state of `task` (read-modify-write per row).
    async fn update(&self, task: &ScheduledTask) -> Result<(), StoreError>;

    /// Pending tasks with `scheduled_at <= until`, ascending by
    /// `scheduled_at` (earliest-due-first). The scheduler calls this with
    /// `now` to pick up due work; the pre-flight calls it with a future
    /// horizon, so overdue tasks waiting on a retry are included too.
    async fn due_before(&self, until: DateTime<Utc>) -> Result<Vec<ScheduledTask>, StoreError>;

    /// The active (pending or running) task for a (document, platform) pair,
    /// if any. At most one exists.
    async fn active_for(
        &self,
        document: DocumentId,
        platform: Platform,
    ) -> Result<Option<ScheduledTask>, StoreError>;

    async fn list_by_user(
        &self,
        user: UserId,
        status: Option<TaskStatus>,
    ) -> Result<Vec<ScheduledTask>, StoreError>;
}
