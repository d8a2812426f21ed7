//! Notifier port - the notification gateway.

use async_trait::async_trait;

use crate::domain::{NotificationKind, NotifyError, UserId};

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        user: UserId,
        kind: NotificationKind,
        payload: serde_json::Value,
    ) -> Result<(), NotifyError>;
}
