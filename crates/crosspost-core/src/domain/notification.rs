//! Notification events sent through the gateway.

use serde::{Deserialize, Serialize};

use super::ids::UserId;

/// What kind of event a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PublishSucceeded,
    PublishFailed,
    SessionExpired,
}

/// One delivered notification.
///
/// The payload stays open-ended JSON: each event kind carries its own shape
/// (task details, aggregated document lists, etc.) and the gateway does not
/// need to understand it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub payload: serde_json::Value,
}

impl Notification {
    pub fn new(user_id: UserId, kind: NotificationKind, payload: serde_json::Value) -> Self {
        Self {
            user_id,
            kind,
            payload,
        }
    }
}
