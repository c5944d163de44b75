//! Storage seams the sync engine drains from.

use async_trait::async_trait;

use crate::models::{MutationId, MutationItem, PhotoId, UnsyncedPhoto};
use crate::Result;

/// Durable FIFO of pending mutations plus the dead-letter log
#[async_trait]
pub trait MutationStore: Send + Sync {
    /// Insert or update by id; an update keeps the item's queue position.
    async fn enqueue_mutation(&self, item: &MutationItem) -> Result<()>;

    /// Pending items, oldest first.
    async fn get_mutation_queue(&self) -> Result<Vec<MutationItem>>;

    /// Delete a pending item. Absent ids are a no-op.
    async fn remove_mutation(&self, id: &MutationId) -> Result<()>;

    /// Record an item that exhausted its retries.
    async fn add_failed_mutation(&self, item: &MutationItem) -> Result<()>;
}

/// Photos captured offline and waiting for upload
#[async_trait]
pub trait PhotoStore: Send + Sync {
    async fn save_photo(&self, photo: &UnsyncedPhoto) -> Result<()>;

    /// Photos not yet uploaded, oldest first.
    async fn list_unsynced_photos(&self) -> Result<Vec<UnsyncedPhoto>>;

    async fn mark_photo_synced(&self, id: &PhotoId) -> Result<()>;
}
