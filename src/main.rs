use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use fare_watcher::config::{AppConfig, LoggingConfig};
use fare_watcher::loader::{LoadReport, load_filters_file};
use fare_watcher::plugins::{Notifier, StdoutNotifier, TelegramNotifier};
use fare_watcher::scheduler::{BatchScheduler, run_filters_once};

#[derive(Parser)]
#[command(name = "fare-watcher", version, about = "Watches flight search results and posts cheap fares to Telegram")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every enabled filter once and exit
    Run {
        /// Filters file, overriding search.filters_path
        #[arg(long)]
        filters: Option<PathBuf>,
        /// Only run filters with these names
        #[arg(long = "only")]
        only: Vec<String>,
        /// Print summaries instead of sending them
        #[arg(long)]
        dry_run: bool,
    },
    /// Run the filters file on the configured cron schedule
    Daemon,
    /// Validate the filters file without opening a browser
    Check {
        #[arg(long)]
        filters: Option<PathBuf>,
        /// Print accepted filters as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("fare_watcher=info"))?;

    let (file_layer, guard) = match &logging.directory {
        Some(directory) => {
            let prefix = logging.file_prefix.as_deref().unwrap_or("fare-watcher.log");
            let appender = tracing_appender::rolling::daily(directory, prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

fn load(config: &AppConfig, filters: Option<PathBuf>) -> Result<LoadReport> {
    let path = filters.unwrap_or_else(|| PathBuf::from(&config.search.filters_path));
    load_filters_file(&path).with_context(|| format!("Failed to read filters from {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_env().context("Failed to load configuration")?;
    let _guard = init_tracing(&config.logging)?;

    info!("Starting Fare Watcher...");

    match cli.command {
        Command::Run { filters, only, dry_run } => {
            let mut loaded = load(&config, filters)?;
            if !only.is_empty() {
                loaded.specs.retain(|spec| only.contains(&spec.name));
                for name in only.iter().filter(|n| !loaded.specs.iter().any(|s| &s.name == *n)) {
                    warn!("No enabled filter named '{}'", name);
                }
            }
            if loaded.specs.is_empty() {
                bail!("No filters to run");
            }

            let notifier: Box<dyn Notifier> = if dry_run {
                Box::new(StdoutNotifier)
            } else {
                Box::new(TelegramNotifier::new(config.telegram.clone()))
            };
            info!("Sending summaries via {}", notifier.name());

            let report = run_filters_once(&config, &loaded.specs, notifier.as_ref()).await?;
            if report.failed() > 0 {
                warn!("{} of {} filters failed", report.failed(), report.filters.len());
            }
        }
        Command::Daemon => {
            let scheduler = BatchScheduler::new(config).await?;
            scheduler.run_until_ctrl_c().await?;
        }
        Command::Check { filters, json } => {
            let loaded = load(&config, filters)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&loaded.specs)?);
            } else {
                for spec in &loaded.specs {
                    println!("ok       {}", spec);
                }
            }
            for err in &loaded.rejected {
                println!("rejected {}", err);
            }
            println!(
                "{} accepted, {} rejected, {} disabled",
                loaded.specs.len(),
                loaded.rejected.len(),
                loaded.disabled
            );
            if !loaded.rejected.is_empty() {
                std::process::exit(1);
            }
        }
    }

    info!("Shutting down...");
    Ok(())
}
