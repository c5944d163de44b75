//! Database layer for Fieldkit

mod connection;
mod migrations;
mod mutation_repository;
mod photo_repository;
mod settings_repository;

pub use connection::Database;
pub use mutation_repository::{LibSqlMutationRepository, MutationRepository};
pub use photo_repository::{LibSqlPhotoRepository, PhotoRepository};
pub use settings_repository::{LibSqlSettingsRepository, SettingsRepository};
