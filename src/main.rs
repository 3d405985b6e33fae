//! Briefly CLI - inspect and curate the research briefing store

mod commands;

use briefly::output::{OutputMode, failure_envelope};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "briefly")]
#[command(version)]
#[command(about = "Research briefing store - briefings, feedback and learned topic patterns")]
#[command(long_about = r#"
Briefly keeps AI-generated research briefings in an embedded SQLite file and
learns which topics you like from your feedback:
  • Browse, search, import and export briefings
  • Rate whole briefings or single cards
  • Inspect the per-topic feedback patterns
  • Bookmark cards and clean up old briefings

Example usage:
  briefly init
  briefly briefings import ./weekly.json
  briefly briefings search "rust"
  briefly feedback add --briefing 3 --card 1 --rating 2
  briefly feedback patterns
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    /// Path to the database file (overrides briefly.toml)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write briefly.toml and create the database
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,

        /// Keep briefings for this many days (default: never delete)
        #[arg(long)]
        retention_days: Option<i64>,
    },

    /// Browse and manage briefings
    Briefings {
        #[command(subcommand)]
        action: BriefingAction,
    },

    /// Rate briefings and inspect learned topic patterns
    Feedback {
        #[command(subcommand)]
        action: FeedbackAction,
    },

    /// Bookmark cards (bookmarked briefings survive cleanup)
    Bookmarks {
        #[command(subcommand)]
        action: BookmarkAction,
    },

    /// Retention cleanup of old briefings
    Housekeeping {
        #[command(subcommand)]
        action: HousekeepingAction,
    },

    /// Show statistics about the store
    Stats,

    /// Show version information
    Version,
}

#[derive(Subcommand)]
pub enum BriefingAction {
    /// List briefings, newest first
    List {
        /// Only briefings from the last N days
        #[arg(long)]
        days: Option<i64>,
    },
    /// Show one briefing with its cards and sources
    Show { id: i64 },
    /// Search titles, topics and summaries
    Search { query: String },
    /// Delete a briefing and everything attached to it
    Delete { id: i64 },
    /// Import briefings from a JSON file (one object or an array)
    Import { file: PathBuf },
    /// Export a briefing
    Export {
        id: i64,
        /// Output format (markdown or json)
        #[arg(short, long, default_value = "markdown")]
        format: String,
    },
}

#[derive(Subcommand)]
pub enum FeedbackAction {
    /// Rate a briefing, or one of its cards
    Add {
        #[arg(long)]
        briefing: i64,
        /// Card index; omit to rate the whole briefing
        #[arg(long)]
        card: Option<i64>,
        /// Positive, negative or zero
        #[arg(long, allow_negative_numbers = true)]
        rating: i64,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Feedback recorded for a briefing
    List { briefing_id: i64 },
    /// Delete all feedback for a briefing
    Clear { briefing_id: i64 },
    /// Totals by rating sign
    Stats,
    /// All topic patterns by engagement
    Patterns,
    /// One topic pattern
    Pattern { topic: String },
    /// Zero a topic pattern
    Reset { topic: String },
}

#[derive(Subcommand)]
pub enum BookmarkAction {
    /// Bookmark a card, or remove its bookmark
    Toggle {
        #[arg(long)]
        briefing: i64,
        #[arg(long)]
        card: i64,
    },
    /// All bookmarks, newest first
    List,
}

#[derive(Subcommand)]
pub enum HousekeepingAction {
    /// Delete old, unbookmarked briefings
    Run {
        /// Retention window (defaults to retention_days from briefly.toml)
        #[arg(long)]
        days: Option<i64>,
        /// Only count what would be deleted
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the retention setting and pending candidates
    Status,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Init { .. } => "init",
            Commands::Briefings { .. } => "briefings",
            Commands::Feedback { .. } => "feedback",
            Commands::Bookmarks { .. } => "bookmarks",
            Commands::Housekeeping { .. } => "housekeeping",
            Commands::Stats => "stats",
            Commands::Version => "version",
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so --json output stays parseable
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mode = OutputMode::from_flag(cli.json);
    let command = cli.command.name();

    let result = commands::Context::load(mode, cli.config, cli.database)
        .and_then(|ctx| commands::dispatch(&ctx, cli.command));

    briefly::close_database();

    if let Err(err) = result {
        if mode.is_human() {
            briefly::ui::error(&format!("{:#}", err));
        } else {
            println!("{}", failure_envelope(command, &err));
        }
        std::process::exit(1);
    }
}
