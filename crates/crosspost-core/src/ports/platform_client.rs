//! PlatformClient port - one third-party platform's publish/list/session
//! operations, supplied externally.
//!
//! The signing, pagination quirks, and wire formats of each platform live in
//! the client implementations; this crate only sees the shapes below.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Document, Platform, PublishConfig, PublishError, UserId};

/// Response of a successful publish call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishReceipt {
    pub remote_id: String,
    pub remote_url: String,

    /// The platform's own status word ("in_review", "published", ...).
    /// Informational; the canonical status comes from reconciliation.
    pub raw_status: String,
}

/// One entry of the remote platform's article listing.
///
/// `host_status` / `sub_status` form the platform's two-part status encoding;
/// the reconciliation engine maps the pair to a canonical local status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub id: String,
    pub title: String,
    pub url: String,
    pub host_status: u8,
    pub sub_status: u8,

    /// Moderator's reason, present when the entry was rejected.
    pub reject_reason: Option<String>,
}

#[async_trait]
pub trait PlatformClient: Send + Sync {
    fn platform(&self) -> Platform;

    async fn publish(
        &self,
        user: UserId,
        document: &Document,
        config: &PublishConfig,
    ) -> Result<PublishReceipt, PublishError>;

    /// One page of the remote listing. Pages are 1-indexed; a short page
    /// signals the end of the listing.
    async fn fetch_listing(
        &self,
        user: UserId,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<RemoteEntry>, PublishError>;

    /// Remote check that the cached session is still accepted.
    async fn check_session(&self, user: UserId) -> Result<bool, PublishError>;
}

#[derive(Debug, Error)]
#[error("client already registered for platform {0}")]
pub struct DuplicateClient(pub Platform);

/// Registry of platform clients (platform -> client).
///
/// Built during initialization (mutable), used during runtime (immutable).
/// This avoids locks on the hot path.
#[derive(Default)]
pub struct ClientRegistry {
    clients: HashMap<Platform, Arc<dyn PlatformClient>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
        }
    }

    pub fn register(&mut self, client: Arc<dyn PlatformClient>) -> Result<(), DuplicateClient> {
        let platform = client.platform();
        if self.clients.contains_key(&platform) {
            return Err(DuplicateClient(platform));
        }
        self.clients.insert(platform, client);
        Ok(())
    }

    pub fn get(&self, platform: Platform) -> Option<Arc<dyn PlatformClient>> {
        self.clients.get(&platform).cloned()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
