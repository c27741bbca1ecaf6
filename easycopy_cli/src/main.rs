//! Easy Copy - Copy captured network requests as JSON
//!
//! Usage:
//!   easycopy panel --har <FILE>           Open the request panel for a HAR capture
//!   easycopy settings show                Show which fields are copied
//!   easycopy settings set FIELD=BOOL...   Change copied fields
//!   easycopy settings reset               Restore the default fields

mod capture;
mod clipboard;
mod commands;
mod config;
mod panel;
mod relay;
mod serializer;
mod settings;
mod tui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "easycopy")]
#[command(version)]
#[command(about = "Copy captured network requests to the clipboard as JSON", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the request panel for a HAR capture
    Panel {
        /// HAR file whose entries are replayed as network traffic
        #[arg(long)]
        har: PathBuf,

        /// Delay between replayed requests in milliseconds
        #[arg(long, env = "EASYCOPY_PACE_MS")]
        pace_ms: Option<u64>,
    },

    /// Manage which fields are copied
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Show the current field selection
    Show,

    /// Include or exclude fields (e.g. statusText=true responseBody=false)
    Set {
        #[arg(required = true)]
        assignments: Vec<String>,
    },

    /// Restore the default field selection
    Reset,
}

/// Default filter: `warn` (or `debug` with `-v`), and `info` for this binary's own targets
fn default_log_filter(verbose: bool) -> String {
    let log_level = if verbose { "debug" } else { "warn" };
    format!("{},{}=info", log_level, env!("CARGO_CRATE_NAME"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Ensure config directories exist
    config::ensure_dirs()?;

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_log_filter(cli.verbose).into());

    if matches!(cli.command, Commands::Panel { .. }) {
        // The terminal belongs to the panel, so logs go to a file
        let log_path = config::logs_dir().join("panel.log");
        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(log_file)),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().without_time())
            .init();
    }

    // Handle commands
    match cli.command {
        Commands::Panel { har, pace_ms } => {
            commands::panel::run(commands::panel::PanelOptions { har, pace_ms }).await?;
        }

        Commands::Settings { action } => match action {
            SettingsAction::Show => commands::settings::show().await?,
            SettingsAction::Set { assignments } => commands::settings::set(&assignments).await?,
            SettingsAction::Reset => commands::settings::reset().await?,
        },
    }

    Ok(())
}
