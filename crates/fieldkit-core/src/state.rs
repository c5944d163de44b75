//! Shared sync state type.

use serde::Serialize;

/// Lifecycle of the sync engine as seen by subscribers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    #[default]
    Idle,
    Syncing,
}

impl SyncState {
    pub const fn from_syncing(syncing: bool) -> Self {
        if syncing {
            Self::Syncing
        } else {
            Self::Idle
        }
    }

    pub const fn is_syncing(self) -> bool {
        matches!(self, Self::Syncing)
    }
}
