//! Failure classification: maps a publish failure to the scheduler's
//! retry / session-expired / fatal decision.

use crate::domain::{FailureClass, PublishError};

/// Pluggable classification strategy.
pub trait FailureClassifier: Send + Sync {
    fn classify(&self, error: &PublishError) -> FailureClass;
}

/// Substrings that mark an opaque error as session-related.
///
/// Heuristic, not an exhaustive classifier: clients that can tell should
/// return typed variants instead of `Opaque` text.
const SESSION_MARKERS: [&str; 5] = ["session", "login", "cookie", "401", "unauthorized"];

/// Default classifier.
///
/// Typed variants pass straight through; the keyword heuristic applies only
/// to `Opaque` errors, which default to retryable when no marker matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl FailureClassifier for DefaultClassifier {
    fn classify(&self, error: &PublishError) -> FailureClass {
        match error {
            PublishError::Retryable(_) => FailureClass::Retryable,
            PublishError::SessionExpired(_) => FailureClass::SessionExpired,
            PublishError::Fatal(_) => FailureClass::Fatal,
            PublishError::Opaque(message) => {
                let lower = message.to_lowercase();
                if SESSION_MARKERS.iter().any(|m| lower.contains(m)) {
                    FailureClass::SessionExpired
                } else {
                    FailureClass::Retryable
                }
            }
        }
    }
}
