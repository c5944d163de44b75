//! Queue drain loop with retry, backoff and dead-lettering.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::dispatch::{ActionKey, ActionRegistry, AdapterResponse, PhotoUploader};
use crate::models::{MutationId, MutationItem, MutationKind, Resource, RetryPolicy, SyncSettings};
use crate::state::SyncState;
use crate::Result;

use super::{Connectivity, MutationStore, PhotoStore};

type Listener = Arc<dyn Fn(bool) + Send + Sync>;

/// Handle returned by [`SyncEngine::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Why a pass stopped before draining the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum HaltReason {
    Offline,
    AlreadySyncing,
    /// A failed item is waiting out its backoff and blocks the items behind it
    Backoff {
        mutation_id: String,
        retry_count: u32,
        delay_ms: u64,
    },
    FailFast {
        mutation_id: String,
        error: String,
    },
    Store {
        error: String,
    },
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offline => f.write_str("offline"),
            Self::AlreadySyncing => f.write_str("a sync pass is already running"),
            Self::Backoff {
                mutation_id,
                retry_count,
                delay_ms,
            } => write!(
                f,
                "mutation {mutation_id} failed (attempt {retry_count}), retrying after {delay_ms}ms"
            ),
            Self::FailFast { mutation_id, error } => {
                write!(f, "mutation {mutation_id} failed: {error}")
            }
            Self::Store { error } => write!(f, "queue storage error: {error}"),
        }
    }
}

/// Outcome of one sync pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Items applied remotely and removed
    pub processed: usize,
    /// Failed attempts, including ones that ended in the dead-letter store
    pub failed: usize,
    pub dead_lettered: usize,
    /// Items removed because no adapter handles them
    pub dropped: usize,
    pub photos_uploaded: usize,
    pub photos_failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted: Option<HaltReason>,
}

impl SyncReport {
    fn halted(reason: HaltReason) -> Self {
        Self {
            halted: Some(reason),
            ..Self::default()
        }
    }
}

enum ItemOutcome {
    Continue,
    Halt(HaltReason),
}

struct PhotoSync {
    store: Arc<dyn PhotoStore>,
    uploader: Arc<dyn PhotoUploader>,
}

/// Drains the durable mutation queue through the action registry.
///
/// One pass runs at a time per engine. Passes start after every
/// [`enqueue`](Self::enqueue), on demand through
/// [`trigger_sync`](Self::trigger_sync), and on offline to online transitions
/// when [`watch_connectivity`](Self::watch_connectivity) is running.
pub struct SyncEngine {
    store: Arc<dyn MutationStore>,
    registry: ActionRegistry,
    connectivity: Arc<dyn Connectivity>,
    photos: Option<PhotoSync>,
    settings: SyncSettings,
    processing: AtomicBool,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_subscription: AtomicU64,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn MutationStore>,
        registry: ActionRegistry,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self {
        Self {
            store,
            registry,
            connectivity,
            photos: None,
            settings: SyncSettings::default(),
            processing: AtomicBool::new(false),
            listeners: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    /// Also drain offline photos after each queue pass.
    #[must_use]
    pub fn with_photos(
        mut self,
        store: Arc<dyn PhotoStore>,
        uploader: Arc<dyn PhotoUploader>,
    ) -> Self {
        self.photos = Some(PhotoSync { store, uploader });
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: SyncSettings) -> Self {
        self.settings = settings;
        self
    }

    pub const fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn is_syncing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> SyncState {
        SyncState::from_syncing(self.is_syncing())
    }

    /// Persist a new mutation and start a sync pass in the background.
    ///
    /// Returns once the item is durable; the pass outcome is logged.
    pub async fn enqueue(
        self: &Arc<Self>,
        kind: MutationKind,
        resource: Resource,
        payload: serde_json::Value,
    ) -> Result<MutationId> {
        let id = self.persist(kind, resource, payload).await?;

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let report = engine.trigger_sync().await;
            if let Some(reason) = &report.halted {
                tracing::debug!("Sync after enqueue halted: {reason}");
            }
        });
        Ok(id)
    }

    /// Persist a new mutation, then run a sync pass to completion.
    pub async fn enqueue_and_sync(
        &self,
        kind: MutationKind,
        resource: Resource,
        payload: serde_json::Value,
    ) -> Result<(MutationId, SyncReport)> {
        let id = self.persist(kind, resource, payload).await?;
        Ok((id, self.trigger_sync().await))
    }

    async fn persist(
        &self,
        kind: MutationKind,
        resource: Resource,
        payload: serde_json::Value,
    ) -> Result<MutationId> {
        let item = MutationItem::new(kind, resource, payload);
        self.store.enqueue_mutation(&item).await?;
        tracing::debug!("Queued {} mutation {}", ActionKey::from(&item), item.id);
        Ok(item.id)
    }

    /// Run a queue pass followed by a photo pass.
    pub async fn trigger_sync(&self) -> SyncReport {
        let Some(_pass) = self.begin_pass() else {
            return self.skipped_report();
        };

        let mut report = SyncReport::default();
        self.drain_queue(&mut report).await;
        self.drain_photos(&mut report).await;

        tracing::info!(
            processed = report.processed,
            failed = report.failed,
            dead_lettered = report.dead_lettered,
            dropped = report.dropped,
            photos_uploaded = report.photos_uploaded,
            photos_failed = report.photos_failed,
            "Sync pass finished"
        );
        report
    }

    /// Run a queue pass only.
    pub async fn process_queue(&self) -> SyncReport {
        let Some(_pass) = self.begin_pass() else {
            return self.skipped_report();
        };

        let mut report = SyncReport::default();
        self.drain_queue(&mut report).await;
        report
    }

    /// Run a photo pass only.
    pub async fn sync_photos(&self) -> SyncReport {
        let Some(_pass) = self.begin_pass() else {
            return self.skipped_report();
        };

        let mut report = SyncReport::default();
        self.drain_photos(&mut report).await;
        report
    }

    /// Register a callback invoked with the syncing flag on every state change.
    pub fn subscribe(&self, listener: impl Fn(bool) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(existing, _)| *existing != id);
    }

    /// Trigger a sync pass on every offline to online transition.
    pub fn watch_connectivity(
        self: &Arc<Self>,
        mut receiver: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        // Read before spawning so a flip ahead of the first poll still counts
        let mut was_online = *receiver.borrow_and_update();
        tokio::spawn(async move {
            while receiver.changed().await.is_ok() {
                let online = *receiver.borrow_and_update();
                if online && !was_online {
                    tracing::info!("Connectivity restored, syncing");
                    engine.trigger_sync().await;
                }
                was_online = online;
            }
        })
    }

    fn begin_pass(&self) -> Option<PassGuard<'_>> {
        if !self.connectivity.is_online() {
            tracing::debug!("Offline, skipping sync");
            return None;
        }
        if self
            .processing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Sync already in progress");
            return None;
        }
        self.notify(true);
        Some(PassGuard { engine: self })
    }

    fn skipped_report(&self) -> SyncReport {
        if self.connectivity.is_online() {
            SyncReport::halted(HaltReason::AlreadySyncing)
        } else {
            SyncReport::halted(HaltReason::Offline)
        }
    }

    fn notify(&self, syncing: bool) {
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect::<Vec<_>>();
        for listener in listeners {
            listener(syncing);
        }
    }

    async fn drain_queue(&self, report: &mut SyncReport) {
        if let Err(error) = self.drain_queue_inner(report).await {
            tracing::error!("Sync pass aborted: {error}");
            report.halted = Some(HaltReason::Store {
                error: error.to_string(),
            });
        }
    }

    async fn drain_queue_inner(&self, report: &mut SyncReport) -> Result<()> {
        let queue = self.store.get_mutation_queue().await?;
        if queue.is_empty() {
            return Ok(());
        }
        tracing::debug!("Processing {} queued mutations", queue.len());

        for item in queue {
            match self.process_item(item, report).await? {
                ItemOutcome::Continue => {}
                ItemOutcome::Halt(reason) => {
                    report.halted = Some(reason);
                    break;
                }
            }
        }
        Ok(())
    }

    async fn process_item(
        &self,
        mut item: MutationItem,
        report: &mut SyncReport,
    ) -> Result<ItemOutcome> {
        let key = ActionKey::from(&item);
        let Some(adapter) = self.registry.resolve(&key) else {
            tracing::error!("No adapter for {key}, dropping mutation {}", item.id);
            self.store.remove_mutation(&item.id).await?;
            report.dropped += 1;
            return Ok(ItemOutcome::Continue);
        };

        let message = match adapter.invoke(&item.payload).await {
            Ok(AdapterResponse { success: true, .. }) => {
                self.store.remove_mutation(&item.id).await?;
                tracing::debug!("Applied {key} mutation {}", item.id);
                report.processed += 1;
                return Ok(ItemOutcome::Continue);
            }
            Ok(AdapterResponse { message, .. }) => {
                message.unwrap_or_else(|| "Remote operation failed".to_string())
            }
            Err(error) => error.to_string(),
        };
        report.failed += 1;

        match self.settings.policy {
            RetryPolicy::FailFast => {
                tracing::warn!("{key} mutation {} failed: {message}", item.id);
                Ok(ItemOutcome::Halt(HaltReason::FailFast {
                    mutation_id: item.id.to_string(),
                    error: message,
                }))
            }
            RetryPolicy::Backoff if item.retry_count < self.settings.max_retries => {
                let delay = self.settings.backoff_delay(item.retry_count);
                item.record_failure(message.as_str());
                self.store.enqueue_mutation(&item).await?;
                tracing::warn!(
                    "{key} mutation {} failed (attempt {}): {message}; retrying in {}ms",
                    item.id,
                    item.retry_count,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                Ok(ItemOutcome::Halt(HaltReason::Backoff {
                    mutation_id: item.id.to_string(),
                    retry_count: item.retry_count,
                    delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                }))
            }
            RetryPolicy::Backoff => {
                item.error = Some(message);
                tracing::error!(
                    "{key} mutation {} exhausted {} retries, moving to failed store",
                    item.id,
                    item.retry_count
                );
                self.store.add_failed_mutation(&item).await?;
                self.store.remove_mutation(&item.id).await?;
                report.dead_lettered += 1;
                Ok(ItemOutcome::Continue)
            }
        }
    }

    async fn drain_photos(&self, report: &mut SyncReport) {
        let Some(photos) = &self.photos else {
            return;
        };

        let pending = match photos.store.list_unsynced_photos().await {
            Ok(pending) => pending,
            Err(error) => {
                tracing::error!("Failed to load unsynced photos: {error}");
                return;
            }
        };

        for photo in pending {
            match photos.uploader.upload(&photo).await {
                Ok(AdapterResponse { success: true, .. }) => {
                    if let Err(error) = photos.store.mark_photo_synced(&photo.id).await {
                        tracing::warn!(
                            "Uploaded photo {} but could not mark it: {error}",
                            photo.id
                        );
                        report.photos_failed += 1;
                    } else {
                        tracing::debug!("Uploaded photo {}", photo.id);
                        report.photos_uploaded += 1;
                    }
                }
                Ok(AdapterResponse { message, .. }) => {
                    tracing::warn!(
                        "Photo {} rejected: {}",
                        photo.id,
                        message.as_deref().unwrap_or("no message")
                    );
                    report.photos_failed += 1;
                }
                Err(error) => {
                    tracing::warn!("Photo {} upload failed: {error}", photo.id);
                    report.photos_failed += 1;
                }
            }
        }
    }
}

impl fmt::Debug for SyncEngine {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SyncEngine")
            .field("registry", &self.registry)
            .field("settings", &self.settings)
            .field("syncing", &self.is_syncing())
            .field("photos", &self.photos.is_some())
            .finish_non_exhaustive()
    }
}

/// Clears the processing flag when a pass ends.
struct PassGuard<'a> {
    engine: &'a SyncEngine,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.engine.processing.store(false, Ordering::SeqCst);
        self.engine.notify(false);
    }
}
