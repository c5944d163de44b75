//! Shared database service wrapper used by the sync engine and the CLI.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::db::{
    Database, LibSqlMutationRepository, LibSqlPhotoRepository, LibSqlSettingsRepository,
    MutationRepository, PhotoRepository, SettingsRepository,
};
use crate::models::{
    FailedMutation, MutationId, MutationItem, PhotoId, SyncSettings, UnsyncedPhoto,
};
use crate::sync::{MutationStore, PhotoStore};
use crate::Result;

/// Thread-safe service for DB and repository operations.
///
/// All queue access goes through this service, which makes the database
/// connection the single serialization point for the queue.
#[derive(Clone)]
pub struct DatabaseService {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl DatabaseService {
    /// Open a database service at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        tracing::debug!("Opening queue database at {}", db_path.display());
        let db = Database::open(&db_path).await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory database service (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    /// Filesystem path of the database, `None` for in-memory services.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Insert or update a queued mutation.
    pub async fn enqueue_mutation(&self, item: &MutationItem) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlMutationRepository::new(db.connection());
        repo.enqueue(item).await
    }

    /// Pending mutations, oldest first.
    pub async fn get_mutation_queue(&self) -> Result<Vec<MutationItem>> {
        let db = self.db.lock().await;
        let repo = LibSqlMutationRepository::new(db.connection());
        repo.list_pending().await
    }

    /// Number of pending mutations.
    pub async fn count_mutations(&self) -> Result<usize> {
        let db = self.db.lock().await;
        let repo = LibSqlMutationRepository::new(db.connection());
        repo.count_pending().await
    }

    /// Remove a resolved mutation.
    pub async fn remove_mutation(&self, id: &MutationId) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlMutationRepository::new(db.connection());
        repo.remove(id).await
    }

    /// Record a mutation in the dead-letter store.
    pub async fn add_failed_mutation(&self, item: &MutationItem) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlMutationRepository::new(db.connection());
        repo.add_failed(item).await
    }

    /// Dead-lettered mutations, oldest failure first.
    pub async fn list_failed_mutations(&self) -> Result<Vec<FailedMutation>> {
        let db = self.db.lock().await;
        let repo = LibSqlMutationRepository::new(db.connection());
        repo.list_failed().await
    }

    /// Move a dead-lettered mutation back onto the queue.
    pub async fn requeue_failed_mutation(&self, id: &MutationId) -> Result<MutationItem> {
        let db = self.db.lock().await;
        let repo = LibSqlMutationRepository::new(db.connection());
        repo.requeue_failed(id).await
    }

    /// Delete all dead-lettered mutations.
    pub async fn clear_failed_mutations(&self) -> Result<usize> {
        let db = self.db.lock().await;
        let repo = LibSqlMutationRepository::new(db.connection());
        repo.clear_failed().await
    }

    /// Store a captured photo.
    pub async fn save_photo(&self, photo: &UnsyncedPhoto) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlPhotoRepository::new(db.connection());
        repo.save(photo).await
    }

    /// Photos waiting for upload.
    pub async fn list_unsynced_photos(&self) -> Result<Vec<UnsyncedPhoto>> {
        let db = self.db.lock().await;
        let repo = LibSqlPhotoRepository::new(db.connection());
        repo.list_unsynced().await
    }

    /// All photos captured for an inspection.
    pub async fn list_photos(&self, inspection_id: &str) -> Result<Vec<UnsyncedPhoto>> {
        let db = self.db.lock().await;
        let repo = LibSqlPhotoRepository::new(db.connection());
        repo.list_for_inspection(inspection_id).await
    }

    /// Flag a photo as uploaded.
    pub async fn mark_photo_synced(&self, id: &PhotoId) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlPhotoRepository::new(db.connection());
        repo.mark_synced(id).await
    }

    /// Load sync settings.
    pub async fn load_settings(&self) -> Result<SyncSettings> {
        let db = self.db.lock().await;
        let repo = LibSqlSettingsRepository::new(db.connection());
        repo.load().await
    }

    /// Save sync settings.
    pub async fn save_settings(&self, settings: &SyncSettings) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlSettingsRepository::new(db.connection());
        repo.save(settings).await
    }
}

#[async_trait]
impl MutationStore for DatabaseService {
    async fn enqueue_mutation(&self, item: &MutationItem) -> Result<()> {
        Self::enqueue_mutation(self, item).await
    }

    async fn get_mutation_queue(&self) -> Result<Vec<MutationItem>> {
        Self::get_mutation_queue(self).await
    }

    async fn remove_mutation(&self, id: &MutationId) -> Result<()> {
        Self::remove_mutation(self, id).await
    }

    async fn add_failed_mutation(&self, item: &MutationItem) -> Result<()> {
        Self::add_failed_mutation(self, item).await
    }
}

#[async_trait]
impl PhotoStore for DatabaseService {
    async fn save_photo(&self, photo: &UnsyncedPhoto) -> Result<()> {
        Self::save_photo(self, photo).await
    }

    async fn list_unsynced_photos(&self) -> Result<Vec<UnsyncedPhoto>> {
        Self::list_unsynced_photos(self).await
    }

    async fn mark_photo_synced(&self, id: &PhotoId) -> Result<()> {
        Self::mark_photo_synced(self, id).await
    }
}
