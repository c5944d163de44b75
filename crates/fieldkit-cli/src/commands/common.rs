use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use fieldkit_core::config::ClientConfig;
use fieldkit_core::dispatch::ActionRegistry;
use fieldkit_core::models::{FailedMutation, MutationItem, SyncSettings, UnsyncedPhoto};
use fieldkit_core::remote::{RemoteActionClient, RemotePhotoUploader};
use fieldkit_core::services::DatabaseService;
use fieldkit_core::sync::{NetworkStatus, SyncEngine};
use serde_json::Value;

use crate::error::CliError;

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path.or_else(|| env::var_os("FIELDKIT_DB_PATH").map(PathBuf::from))
    {
        return Ok(path);
    }
    default_db_path().ok_or(CliError::NoDataDir)
}

pub fn default_db_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("fieldkit").join("fieldkit.db"))
}

pub async fn open_database(path: &Path) -> Result<DatabaseService, CliError> {
    Ok(DatabaseService::open_path(path).await?)
}

pub fn load_config(path: Option<&Path>) -> Result<ClientConfig, CliError> {
    Ok(ClientConfig::resolve(path)?)
}

/// Config file settings win over the ones stored in the database.
pub async fn effective_settings(
    db: &DatabaseService,
    config: &ClientConfig,
) -> Result<SyncSettings, CliError> {
    match &config.sync {
        Some(settings) => Ok(settings.clone()),
        None => Ok(db.load_settings().await?),
    }
}

/// Wire the sync engine against the configured API.
///
/// Without an API base URL, or when the config says offline, the engine only
/// queues.
pub async fn build_engine(
    db: &DatabaseService,
    config: &ClientConfig,
) -> Result<SyncEngine, CliError> {
    let settings = effective_settings(db, config).await?;
    let store = Arc::new(db.clone());

    if config.api_base_url.is_none() {
        tracing::info!("No API base URL configured; mutations will stay queued");
        return Ok(
            SyncEngine::new(store, ActionRegistry::new(), Arc::new(NetworkStatus::new(false)))
                .with_settings(settings),
        );
    }

    let client = RemoteActionClient::from_config(config)?;
    let uploader = RemotePhotoUploader::from_config(config)?;
    let registry = client.registry();
    let missing = registry.missing_keys();
    if !missing.is_empty() {
        tracing::warn!(
            "No adapter registered for: {}",
            missing
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    let network = Arc::new(NetworkStatus::new(!config.offline));
    Ok(SyncEngine::new(store.clone(), registry, network)
        .with_photos(store, Arc::new(uploader))
        .with_settings(settings))
}

pub fn resolve_payload(payload: Option<&str>) -> Result<Value, CliError> {
    if let Some(raw) = payload.and_then(normalize_input) {
        return parse_payload(&raw);
    }
    if let Some(raw) = read_piped_stdin()? {
        return parse_payload(&raw);
    }
    Err(CliError::EmptyPayload)
}

pub fn parse_payload(raw: &str) -> Result<Value, CliError> {
    let value: Value = serde_json::from_str(raw)?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(CliError::InvalidPayload)
    }
}

pub fn normalize_input(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_input(&buffer))
}

pub fn short_id(id: &str) -> String {
    id.chars().take(13).collect()
}

pub fn format_mutation_lines(items: &[MutationItem]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    items
        .iter()
        .map(|item| {
            let key = format!("{}:{}", item.resource, item.kind);
            let age = format_relative_time(item.created_at, now_ms);
            let line = format!(
                "{:<13}  {key:<18}  retries={}  {age}",
                short_id(&item.id.to_string()),
                item.retry_count
            );
            match &item.error {
                Some(error) => format!("{line}  last error: {error}"),
                None => line,
            }
        })
        .collect()
}

pub fn format_failed_lines(failed: &[FailedMutation]) -> Vec<String> {
    failed
        .iter()
        .map(|entry| {
            let item = &entry.item;
            format!(
                "{}  {}  {}:{}  retries={}  {}",
                item.id,
                format_timestamp(entry.failed_at),
                item.resource,
                item.kind,
                item.retry_count,
                item.error.as_deref().unwrap_or("no error recorded")
            )
        })
        .collect()
}

pub fn format_photo_lines(photos: &[UnsyncedPhoto]) -> Vec<String> {
    photos
        .iter()
        .map(|photo| {
            let status = if photo.synced { "synced" } else { "pending" };
            let mut line = format!(
                "{:<13}  {:<7}  {}  {} ({} bytes)",
                short_id(&photo.id.to_string()),
                status,
                photo.inspection_id,
                photo.file_name,
                photo.size_bytes()
            );
            if !photo.category.is_empty() {
                line.push_str(&format!("  [{}]", photo.category));
            }
            if !photo.caption.is_empty() {
                line.push_str(&format!("  {}", photo.caption));
            }
            line
        })
        .collect()
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else {
        format!("{}w ago", diff / week)
    }
}
