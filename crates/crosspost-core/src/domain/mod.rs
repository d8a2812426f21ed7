//! Domain model: identifiers, platforms, task and document records, errors,
//! and notification events.

pub mod document;
pub mod errors;
pub mod ids;
pub mod notification;
pub mod platform;
pub mod task;

pub use self::document::{Document, PublicationRecord, PublicationStatus};
pub use self::errors::{
    FailureClass, NotifyError, PublishError, ReconcileError, ScheduleError, StoreError,
};
pub use self::ids::{DocumentId, TaskId, UserId};
pub use self::notification::{Notification, NotificationKind};
pub use self::platform::{Platform, PublishConfig};
pub use self::task::{ScheduledTask, TaskStatus};
