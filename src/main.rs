mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use calkeep_core::config::SchedulerConfig;
use calkeep_core::store::DirStore;
use clap::{Parser, Subcommand};
use env_logger::Env;

#[derive(Parser)]
#[command(name = "calkeep")]
#[command(about = "File events into a dedicated calendar, with alarms and recurrence")]
struct Cli {
    /// Store directory (defaults to `store_dir` from the config, ~/calkeep)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Config file (defaults to ~/.config/calkeep/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an event to the configured calendar
    Add(commands::add::AddArgs),
    /// Remove events by identifier (missing ones are skipped)
    Remove { ids: Vec<String> },
    /// List event calendars
    Calendars,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    let config = match &cli.config {
        Some(path) => SchedulerConfig::load_from(path),
        None => SchedulerConfig::load(),
    }
    .context("Failed to load configuration")?;

    let store_path = cli.store.clone().unwrap_or_else(|| config.store_path());
    log::debug!("Using store at {}", store_path.display());
    let store = DirStore::create(&store_path)
        .with_context(|| format!("Failed to open store at {}", store_path.display()))?;

    match cli.command {
        Commands::Add(args) => commands::add::run(store, config, args),
        Commands::Remove { ids } => commands::remove::run(store, config, ids),
        Commands::Calendars => commands::calendars::run(&store, &config),
    }
}
