//! Error types and failure classification.

use thiserror::Error;

use super::platform::Platform;

/// Storage failure (the in-memory stores are infallible in practice, but the
/// port contract allows a durable backend to fail).
#[derive(Debug, Clone, Error)]
#[error("store error: {0}")]
pub struct StoreError(pub String);

/// Notification gateway failure. Logged, never fatal to the engine.
#[derive(Debug, Clone, Error)]
#[error("notify error: {0}")]
pub struct NotifyError(pub String);

/// Scheduling-time errors, surfaced synchronously to the caller.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Bad scheduling input: past due time, duplicate active task for the
    /// (document, platform) pair, or a config for the wrong platform.
    #[error("validation: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Operation attempted on a task not in the required state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Execution-time failure reported by a platform client.
///
/// The taxonomy is typed so callers never have to parse error text. `Opaque`
/// exists for clients that can only surface a human-readable message; the
/// classifier applies its keyword heuristic to that variant alone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// Transient failure; worth retrying.
    #[error("retryable: {0}")]
    Retryable(String),

    /// The cached credential is no longer valid. Not retryable; the user
    /// must re-authenticate.
    #[error("session expired: {0}")]
    SessionExpired(String),

    /// Permanent failure; retrying cannot help.
    #[error("fatal: {0}")]
    Fatal(String),

    /// Unclassified failure text from a legacy client.
    #[error("{0}")]
    Opaque(String),
}

/// Decision the scheduler acts on after classifying a `PublishError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Consumes one retry and re-queues with backoff.
    Retryable,

    /// Fails immediately without consuming retry budget; the user gets a
    /// session-expired notice instead of a generic failure.
    SessionExpired,

    /// Fails immediately without consuming retry budget.
    Fatal,
}

/// Reconciliation errors. A failure anywhere aborts the whole run; there is
/// no partial commit.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("no client registered for platform {0}")]
    NoClient(Platform),

    #[error("listing fetch failed on {platform}: {source}")]
    Listing {
        platform: Platform,
        source: PublishError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}
