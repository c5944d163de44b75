//! Offline mutation sync: durable queue drain, photo upload and connectivity.

mod connectivity;
mod engine;
mod store;

pub use connectivity::{Connectivity, NetworkStatus};
pub use engine::{HaltReason, SubscriptionId, SyncEngine, SyncReport};
pub use store::{MutationStore, PhotoStore};
