//! Fieldkit CLI - queue field-service changes offline and sync them later
//!
//! Composition root for the sync engine: opens the local queue database,
//! wires the HTTP adapters from configuration, and exposes queue, photo,
//! template and settings tooling.

mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;

use crate::cli::{
    Cli, Commands, FailedCommands, PhotoCommands, SettingsCommands, TemplateCommands,
};
use crate::commands::common::{load_config, resolve_db_path};
use crate::commands::completions::run_completions;
use crate::commands::enqueue::run_enqueue;
use crate::commands::failed::{run_failed_clear, run_failed_list, run_failed_retry};
use crate::commands::photo::{run_photo_add, run_photo_list};
use crate::commands::queue::run_queue;
use crate::commands::settings::{run_settings_set, run_settings_show};
use crate::commands::sync::run_sync;
use crate::commands::template::{run_template_check, run_template_score};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "fieldkit=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref())?,
        Commands::Template { command } => match command {
            TemplateCommands::Check { path } => {
                run_template_check(&path)?;
            }
            TemplateCommands::Score {
                template,
                answers,
                json,
            } => {
                run_template_score(&template, &answers, json)?;
            }
        },
        command => {
            let db_path = resolve_db_path(cli.db_path)?;
            let config = load_config(cli.config.as_deref())?;
            run_queue_command(command, &config, &db_path).await?;
        }
    }

    Ok(())
}

async fn run_queue_command(
    command: Commands,
    config: &fieldkit_core::config::ClientConfig,
    db_path: &std::path::Path,
) -> Result<(), CliError> {
    match command {
        Commands::Enqueue {
            resource,
            kind,
            payload,
        } => {
            run_enqueue(resource, kind, payload.as_deref(), config, db_path).await?;
        }
        Commands::Queue { json } => run_queue(json, db_path).await?,
        Commands::Failed { command, json } => match command {
            None => run_failed_list(json, db_path).await?,
            Some(FailedCommands::Retry { id }) => {
                run_failed_retry(&id, db_path).await?;
            }
            Some(FailedCommands::Clear) => {
                run_failed_clear(db_path).await?;
            }
        },
        Commands::Sync { json } => {
            run_sync(json, config, db_path).await?;
        }
        Commands::Photo { command } => match command {
            PhotoCommands::Add {
                path,
                inspection,
                caption,
                category,
            } => {
                run_photo_add(
                    &path,
                    &inspection,
                    caption.as_deref(),
                    category.as_deref(),
                    db_path,
                )
                .await?;
            }
            PhotoCommands::List { inspection, json } => {
                run_photo_list(inspection.as_deref(), json, db_path).await?;
            }
        },
        Commands::Settings { command } => match command {
            SettingsCommands::Show { json } => {
                run_settings_show(json, config, db_path).await?;
            }
            SettingsCommands::Set {
                policy,
                max_retries,
                backoff_base_ms,
            } => {
                run_settings_set(policy, max_retries, backoff_base_ms, db_path).await?;
            }
        },
        Commands::Completions { .. } | Commands::Template { .. } => {}
    }
    Ok(())
}
