//! contactbook CLI
//!
//! Command-line interface for contactbook - local contact management.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use contactbook_core::{Config, ContactDraft, ContactStore, StoreEvent, SyncPolicy};

mod commands;
mod output;
mod prompt;

use commands::contact::ContactFields;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "contactbook")]
#[command(about = "contactbook - Local contact management")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to an alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all contacts
    #[command(alias = "ls")]
    List,
    /// Show contact details
    Show {
        /// Contact ID (full ID or prefix)
        id: String,
    },
    /// Add a new contact
    Add {
        /// Display name
        #[arg(short, long)]
        name: String,
        /// Phone number
        #[arg(short = 'P', long)]
        phone: String,
        /// Email address
        #[arg(short, long)]
        email: Option<String>,
        /// Photo URI
        #[arg(short, long)]
        photo: Option<String>,
    },
    /// Edit a contact (prompts for each field when no flags are given)
    Edit {
        /// Contact ID (full ID or prefix)
        id: String,
        /// New display name
        #[arg(short, long)]
        name: Option<String>,
        /// New phone number
        #[arg(short = 'P', long)]
        phone: Option<String>,
        /// New email address (empty to remove)
        #[arg(short, long)]
        email: Option<String>,
        /// New photo URI (empty to remove)
        #[arg(short, long)]
        photo: Option<String>,
    },
    /// Delete a contact
    #[command(alias = "rm")]
    Delete {
        /// Contact ID (full ID or prefix)
        id: String,
    },
    /// Delete all contacts
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Search contacts by name, phone or email
    Search {
        /// Search query
        query: String,
    },
    /// Import contacts from the device address book
    Sync {
        /// Address book export to read (overrides device_contacts_path)
        #[arg(short, long)]
        source: Option<PathBuf>,
        /// Keep local details when a phone number already exists
        #[arg(long, conflicts_with = "overwrite")]
        keep_local: bool,
        /// Replace local details with the device entry
        #[arg(long)]
        overwrite: bool,
    },
    /// Show status (storage location, contact count)
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, device_contacts_path, sync_policy, highlight_ms, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands don't need the store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())?;
    init_logging(&config);

    let mut store = ContactStore::open_with_config(&config).await;
    let events = store.take_event_receiver();

    let result = match cli.command {
        Commands::List => commands::contact::list(&store, &output),
        Commands::Show { id } => commands::contact::show(&store, id, &output),
        Commands::Add {
            name,
            phone,
            email,
            photo,
        } => {
            let draft = ContactDraft {
                id: None,
                name,
                phone,
                email,
                photo,
            };
            commands::contact::add(&mut store, draft, &output).await
        }
        Commands::Edit {
            id,
            name,
            phone,
            email,
            photo,
        } => {
            let fields = ContactFields {
                name,
                phone,
                email,
                photo,
            };
            commands::contact::edit(&mut store, id, fields, &output).await
        }
        Commands::Delete { id } => commands::contact::delete(&mut store, id, &output).await,
        Commands::Clear { yes } => commands::contact::clear(&mut store, yes, &output).await,
        Commands::Search { query } => commands::contact::search(&mut store, query, &output),
        Commands::Sync {
            source,
            keep_local,
            overwrite,
        } => {
            if keep_local {
                store.set_sync_policy(SyncPolicy::KeepLocal);
            } else if overwrite {
                store.set_sync_policy(SyncPolicy::OverwriteWithDevice);
            }
            commands::sync::sync(&mut store, &config, source, &output).await
        }
        Commands::Status => commands::status::show(&store, &config, &output),
        Commands::Config { .. } => unreachable!(), // Handled above
    };

    if let Some(mut events) = events {
        let mut last_issue = None;
        while let Ok(event) = events.try_recv() {
            match event {
                StoreEvent::LoadFailed(issue) => {
                    output.warn(&format!("Saved contacts could not be loaded: {}", issue))
                }
                StoreEvent::PersistFailed(issue) => last_issue = Some(issue),
                _ => {}
            }
        }
        if result.is_ok() && (last_issue.is_some() || store.is_dirty()) && !store.flush().await {
            // The retry reports its own failure
            while let Ok(event) = events.try_recv() {
                if let StoreEvent::PersistFailed(issue) = event {
                    last_issue = Some(issue);
                }
            }
            match last_issue {
                Some(issue) => bail!(
                    "Changes could not be saved to {}: {}",
                    config.storage_dir().display(),
                    issue
                ),
                None => bail!(
                    "Changes could not be saved to {}",
                    config.storage_dir().display()
                ),
            }
        }
    }

    result
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize logging
///
/// Only initializes if CONTACTBOOK_LOG environment variable is set.
/// Logs to config.log_file when set, stderr otherwise.
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("CONTACTBOOK_LOG") else {
        return;
    };

    let env_filter = EnvFilter::new(format!(
        "contactbook_core={},contactbook_cli={}",
        log_level, log_level
    ));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    match config.log_file {
        Some(ref log_path) => {
            let log_file = match File::create(log_path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
                    return;
                }
            };
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(log_file))
                .try_init();
            info!("Logging initialized to {:?}", log_path);
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}
