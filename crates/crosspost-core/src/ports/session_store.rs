//! SessionStore port - cached platform-session validity.
//!
//! Acquiring sessions (login flows, cookies, tokens) is out of scope; the
//! engine only asks "do we believe this user is logged in here" and clears
//! the flag when a remote check says otherwise.

use async_trait::async_trait;

use crate::domain::{Platform, StoreError, UserId};

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Cheap local check, never a remote call.
    async fn is_valid(&self, user: UserId, platform: Platform) -> Result<bool, StoreError>;

    /// Clear the cached session and flip the logged-in flag.
    async fn invalidate(&self, user: UserId, platform: Platform) -> Result<(), StoreError>;

    /// All (user, platform) pairs currently marked logged in, in a stable
    /// order so sweeps are deterministic.
    async fn active_pairs(&self) -> Result<Vec<(UserId, Platform)>, StoreError>;
}
