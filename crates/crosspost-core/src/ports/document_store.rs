//! DocumentStore port - the scheduler's view of the document repository.
//!
//! The full document aggregate (editing, versions, assets) lives elsewhere;
//! the engine only reads documents and writes publication records.

use async_trait::async_trait;

use crate::domain::{Document, DocumentId, Platform, PublicationRecord, StoreError, UserId};

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, id: DocumentId) -> Result<Option<Document>, StoreError>;

    async fn list_by_user(&self, user: UserId) -> Result<Vec<Document>, StoreError>;

    /// Replace the publication record for one (document, platform) pair.
    ///
    /// Errors if the document does not exist. No wider isolation is taken:
    /// a concurrent foreground edit to the same document races with this
    /// write-back, last writer wins on diverging fields.
    async fn update_publication(
        &self,
        document: DocumentId,
        platform: Platform,
        record: PublicationRecord,
    ) -> Result<(), StoreError>;
}
