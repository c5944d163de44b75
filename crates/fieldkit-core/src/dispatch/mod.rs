//! Action dispatch: typed `(resource, operation)` keys mapped to adapters.
//!
//! An adapter turns a queued, opaque payload into a call against the remote
//! system and normalizes the outcome into an [`AdapterResponse`]. A remote
//! rejection is `Ok(AdapterResponse { success: false, .. })`; a transport or
//! system failure is `Err(AdapterError)`. The sync engine retries both.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Error;
use crate::models::{MutationItem, MutationKind, Resource, UnsyncedPhoto};

/// Dispatch key for a queued mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionKey {
    pub resource: Resource,
    pub kind: MutationKind,
}

impl ActionKey {
    pub const fn new(resource: Resource, kind: MutationKind) -> Self {
        Self { resource, kind }
    }

    /// Every key this build knows about
    pub fn all() -> impl Iterator<Item = Self> {
        Resource::ALL.into_iter().flat_map(|resource| {
            MutationKind::ALL
                .into_iter()
                .map(move |kind| Self::new(resource, kind))
        })
    }
}

impl From<&MutationItem> for ActionKey {
    fn from(item: &MutationItem) -> Self {
        Self::new(item.resource, item.kind)
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.kind)
    }
}

impl FromStr for ActionKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (resource, kind) = s.split_once(':').ok_or_else(|| {
            Error::InvalidInput(format!("Action key must look like resource:TYPE, got {s}"))
        })?;
        Ok(Self::new(resource.parse()?, kind.parse()?))
    }
}

/// Normalized outcome of a remote operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AdapterResponse {
    pub const fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Transport or system failure raised while invoking an adapter
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Invalid payload: {0}")]
    Invalid(String),
    #[error("{0}")]
    Other(String),
}

/// Remote invocation for one action key
#[async_trait]
pub trait ActionAdapter: Send + Sync {
    async fn invoke(&self, payload: &serde_json::Value) -> Result<AdapterResponse, AdapterError>;
}

/// Adapter backed by an async closure
pub struct FnAdapter<F>(F);

#[async_trait]
impl<F, Fut> ActionAdapter for FnAdapter<F>
where
    F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<AdapterResponse, AdapterError>> + Send + 'static,
{
    async fn invoke(&self, payload: &serde_json::Value) -> Result<AdapterResponse, AdapterError> {
        (self.0)(payload.clone()).await
    }
}

/// Wrap an async closure as a shareable adapter.
pub fn adapter_fn<F, Fut>(f: F) -> Arc<dyn ActionAdapter>
where
    F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<AdapterResponse, AdapterError>> + Send + 'static,
{
    Arc::new(FnAdapter(f))
}

/// Upload target for offline photos
#[async_trait]
pub trait PhotoUploader: Send + Sync {
    async fn upload(&self, photo: &UnsyncedPhoto) -> Result<AdapterResponse, AdapterError>;
}

/// Registry of adapters keyed by [`ActionKey`]
#[derive(Clone, Default)]
pub struct ActionRegistry {
    adapters: HashMap<ActionKey, Arc<dyn ActionAdapter>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the adapter for a key.
    pub fn register(&mut self, key: ActionKey, adapter: Arc<dyn ActionAdapter>) {
        if self.adapters.insert(key, adapter).is_some() {
            tracing::debug!("Replaced adapter for {key}");
        }
    }

    #[must_use]
    pub fn with(mut self, key: ActionKey, adapter: Arc<dyn ActionAdapter>) -> Self {
        self.register(key, adapter);
        self
    }

    pub fn resolve(&self, key: &ActionKey) -> Option<Arc<dyn ActionAdapter>> {
        self.adapters.get(key).cloned()
    }

    /// Keys with no registered adapter, in declaration order.
    pub fn missing_keys(&self) -> Vec<ActionKey> {
        ActionKey::all()
            .filter(|key| !self.adapters.contains_key(key))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys = self
            .adapters
            .keys()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        keys.sort();
        formatter
            .debug_struct("ActionRegistry")
            .field("keys", &keys)
            .finish()
    }
}
