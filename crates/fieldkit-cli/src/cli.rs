use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use fieldkit_core::models::RetryPolicy;
use fieldkit_core::{MutationKind, Resource};

#[derive(Parser)]
#[command(name = "fieldkit")]
#[command(about = "Queue field-service changes offline and sync them when connected")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to a JSON config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Queue a mutation and attempt to sync it
    Enqueue {
        /// Target resource (job, equipment, inspection, invoice, report)
        #[arg(value_parser = parse_resource)]
        resource: Resource,
        /// Operation (CREATE, UPDATE, DELETE)
        #[arg(value_name = "TYPE", value_parser = parse_kind)]
        kind: MutationKind,
        /// JSON object payload (read from stdin when omitted)
        #[arg(long, value_name = "JSON")]
        payload: Option<String>,
    },
    /// List pending mutations
    Queue {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List or recover mutations that exhausted their retries
    Failed {
        #[command(subcommand)]
        command: Option<FailedCommands>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a sync pass and print the report
    Sync {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Capture and list offline photos
    Photo {
        #[command(subcommand)]
        command: PhotoCommands,
    },
    /// Validate and evaluate inspection templates
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },
    /// Show or change sync settings stored in the database
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
}

impl From<CompletionShell> for clap_complete::Shell {
    fn from(shell: CompletionShell) -> Self {
        match shell {
            CompletionShell::Bash => Self::Bash,
            CompletionShell::Zsh => Self::Zsh,
            CompletionShell::Fish => Self::Fish,
            CompletionShell::PowerShell => Self::PowerShell,
        }
    }
}

#[derive(Subcommand)]
pub enum FailedCommands {
    /// Move a failed mutation back to the end of the queue
    Retry {
        /// Mutation ID
        id: String,
    },
    /// Delete every failed mutation
    Clear,
}

#[derive(Subcommand)]
pub enum PhotoCommands {
    /// Store a photo for upload on the next sync
    Add {
        /// Image file to capture
        path: PathBuf,
        /// Inspection the photo belongs to
        #[arg(long, value_name = "ID")]
        inspection: String,
        /// Free-form caption
        #[arg(long)]
        caption: Option<String>,
        /// Report category (e.g. attic, hvac)
        #[arg(long)]
        category: Option<String>,
    },
    /// List photos waiting for upload, or all photos of an inspection
    List {
        /// Inspection ID
        #[arg(long, value_name = "ID")]
        inspection: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum TemplateCommands {
    /// Check a template for duplicate ids and dangling rule references
    Check {
        /// Template JSON file
        path: PathBuf,
    },
    /// Evaluate visibility and score a set of answers
    Score {
        /// Template JSON file
        template: PathBuf,
        /// Answers JSON file (array of answers or object keyed by question id)
        answers: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Print the effective sync settings
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update stored sync settings
    Set {
        /// Failure policy (backoff, fail_fast)
        #[arg(long, value_parser = parse_policy)]
        policy: Option<RetryPolicy>,
        /// Failed attempts before a mutation is moved to the failed store
        #[arg(long)]
        max_retries: Option<u32>,
        /// First retry delay in milliseconds, doubled per attempt
        #[arg(long)]
        backoff_base_ms: Option<u64>,
    },
}

fn parse_resource(value: &str) -> Result<Resource, String> {
    value.parse().map_err(|error: fieldkit_core::Error| error.to_string())
}

fn parse_kind(value: &str) -> Result<MutationKind, String> {
    value.parse().map_err(|error: fieldkit_core::Error| error.to_string())
}

fn parse_policy(value: &str) -> Result<RetryPolicy, String> {
    value.parse().map_err(|error: fieldkit_core::Error| error.to_string())
}
