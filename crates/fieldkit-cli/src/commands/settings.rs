use std::path::Path;

use fieldkit_core::config::ClientConfig;
use fieldkit_core::models::{RetryPolicy, SyncSettings};

use crate::commands::common::{effective_settings, open_database};
use crate::error::CliError;

pub async fn run_settings_show(
    as_json: bool,
    config: &ClientConfig,
    db_path: &Path,
) -> Result<SyncSettings, CliError> {
    let db = open_database(db_path).await?;
    let settings = effective_settings(&db, config).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
    } else {
        println!("policy={}", settings.policy);
        println!("max_retries={}", settings.max_retries);
        println!("backoff_base_ms={}", settings.backoff_base_ms);
        if config.sync.is_some() {
            println!("(overridden by config file)");
        }
    }
    Ok(settings)
}

pub async fn run_settings_set(
    policy: Option<RetryPolicy>,
    max_retries: Option<u32>,
    backoff_base_ms: Option<u64>,
    db_path: &Path,
) -> Result<SyncSettings, CliError> {
    if policy.is_none() && max_retries.is_none() && backoff_base_ms.is_none() {
        return Err(CliError::NoSettingsChange);
    }

    let db = open_database(db_path).await?;
    let mut settings = db.load_settings().await?;
    if let Some(policy) = policy {
        settings.policy = policy;
    }
    if let Some(max_retries) = max_retries {
        settings.max_retries = max_retries;
    }
    if let Some(backoff_base_ms) = backoff_base_ms {
        settings.backoff_base_ms = backoff_base_ms;
    }

    db.save_settings(&settings).await?;
    tracing::info!("Saved sync settings: {settings:?}");
    println!(
        "policy={} max_retries={} backoff_base_ms={}",
        settings.policy, settings.max_retries, settings.backoff_base_ms
    );
    Ok(settings)
}
