//! fieldkit-core - Core library for Fieldkit
//!
//! Offline-first plumbing for field-service clients: a durable mutation
//! queue drained by a sync engine through typed action adapters, offline
//! photo upload, and the inspection form logic (visibility rules, scoring).

pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod forms;
pub mod models;
pub mod remote;
pub mod services;
pub mod state;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{MutationId, MutationItem, MutationKind, Resource};
