//! # Book Club Sync CLI (`bookclub`)
//!
//! ## Usage
//!
//! ```bash
//! bookclub [--config ./config/bookclub.toml] [--ratings-file data/ratings.csv] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `bookclub sync` | Aggregate ratings and upsert them into Notion (default) |
//! | `bookclub sync --dry-run` | Show the reconciliation plan without writing |
//! | `bookclub stats` | Print per-book statistics; no network access |
//! | `bookclub wipe` | Archive every row in the Notion database |
//!
//! `sync` and `wipe` need `NOTION_TOKEN` and `NOTION_DATABASE_ID` in the
//! environment. Logging is controlled with `RUST_LOG` (default
//! `bookclub=info`).

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bookclub_sync::config;
use bookclub_sync::progress::ProgressMode;
use bookclub_sync::sync;

/// Book Club Sync: aggregate member ratings and upsert per-book
/// statistics into a Notion database.
#[derive(Parser)]
#[command(
    name = "bookclub",
    about = "Book Club Sync: aggregate ratings from CSV and upsert them into Notion",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Optional; built-in defaults are used when the file does not exist.
    #[arg(long, global = true, default_value = "./config/bookclub.toml")]
    config: PathBuf,

    /// Input ratings CSV. Overrides `input.ratings_file` from config.
    #[arg(long, global = true)]
    ratings_file: Option<PathBuf>,

    /// Progress output on stderr. Defaults to `human` on a TTY, else `off`.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Aggregate ratings and upsert them into the Notion database.
    ///
    /// Books whose stored statistics already match are skipped. Books
    /// that exist in Notion but not in the CSV are left untouched.
    Sync {
        /// Show the reconciliation plan without writing to Notion.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print per-book statistics without contacting Notion.
    Stats,

    /// Archive every row in the Notion database.
    Wipe,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bookclub=info,bookclub_sync=info,bookclub_sync_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let cfg = config::load_or_default(&cli.config)?;
    let ratings_file = cli
        .ratings_file
        .clone()
        .unwrap_or_else(|| cfg.input.ratings_file.clone());
    let reporter = cli
        .progress
        .unwrap_or_else(ProgressMode::default_for_tty)
        .reporter();

    match cli.command.unwrap_or(Commands::Sync { dry_run: false }) {
        Commands::Sync { dry_run } => {
            let report = sync::run_sync(&cfg, &ratings_file, dry_run, reporter.as_ref()).await?;
            if !report.is_success() {
                anyhow::bail!("{} of the planned changes failed", report.failed);
            }
        }
        Commands::Stats => {
            sync::run_stats(&ratings_file, reporter.as_ref())?;
        }
        Commands::Wipe => {
            let report = sync::run_wipe(&cfg, reporter.as_ref()).await?;
            if report.failed > 0 {
                anyhow::bail!("{} rows could not be archived", report.failed);
            }
        }
    }

    Ok(())
}
