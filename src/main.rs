//! Command-line host for the content mirror.

mod commands;
mod error;

use clap::{ArgAction, Parser, Subcommand};
use mirror_content::EntityKind;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Mirror a headless CMS's published content into a local SQLite cache.
#[derive(Parser)]
#[command(name = "mirror", version, about)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON), merged over the user config.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Log more (repeat for even more). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    /// Log less (repeat for even less).
    #[arg(short, long, global = true, action = ArgAction::Count, conflicts_with = "verbose")]
    quiet: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create or upgrade the cache database.
    Migrate,
    /// Pull content from the remote into the cache.
    #[command(subcommand)]
    Sync(SyncCommand),
    /// Handle one change notification (JSON) read from FILE, or stdin.
    Webhook { file: Option<PathBuf> },
    /// Query the cache and print the mapped records as JSON.
    Query {
        #[arg(value_parser = parse_kind)]
        kind: EntityKind,
        /// Query description, e.g. '{"filter": {"type": {"_eq": "auction"}}, "limit": 10}'.
        #[arg(long)]
        query: Option<String>,
        /// Locale to resolve translations in. Defaults to the configured locale.
        #[arg(long)]
        locale: Option<String>,
    },
}

#[derive(Subcommand)]
enum SyncCommand {
    /// Resync every record of one kind, or of every kind.
    All {
        #[arg(long, value_parser = parse_kind)]
        kind: Option<EntityKind>,
    },
    /// Sync a single record by key.
    Item {
        #[arg(value_parser = parse_kind)]
        kind: EntityKind,
        key: String,
    },
}

fn parse_kind(input: &str) -> Result<EntityKind, String> {
    input.parse().map_err(|err: mirror_content::error::Error| err.to_string())
}

fn level(verbose: u8, quiet: u8) -> LevelFilter {
    match i16::from(verbose) - i16::from(quiet) {
        ..=-2 => LevelFilter::ERROR,
        -1 => LevelFilter::WARN,
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        2.. => LevelFilter::TRACE,
    }
}

fn init_tracing(level: LevelFilter) {
    let filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();
    // Logs go to stderr; stdout is reserved for command output.
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(level(cli.verbose, cli.quiet));
    match commands::run(cli.config.as_deref(), cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        },
    }
}
