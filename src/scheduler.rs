use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::driver::ChromeDriver;
use crate::loader::load_filters_file;
use crate::models::FilterSpec;
use crate::plugins::{Notifier, TelegramNotifier};
use crate::runner::{BatchReport, Runner};

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScheduleStats {
    pub runs: u64,
    pub skipped_overlaps: u64,
    pub failed_filters: u64,
    pub last_run_id: Option<Uuid>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Launch a browser, run `specs` once and close the browser again.
pub async fn run_filters_once(
    config: &AppConfig,
    specs: &[FilterSpec],
    notifier: &dyn Notifier,
) -> Result<BatchReport> {
    let driver = ChromeDriver::launch(&config.browser).context("Failed to start browser")?;
    let runner = Runner::new(&driver, notifier, config);
    Ok(runner.run_batch(specs).await)
}

/// Runs the whole filters file on a cron schedule until shut down.
pub struct BatchScheduler {
    scheduler: JobScheduler,
    config: Arc<AppConfig>,
    stats: Arc<RwLock<ScheduleStats>>,
    // Held for the length of a batch so ticks never overlap.
    running: Arc<Mutex<()>>,
}

impl BatchScheduler {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler,
            config: Arc::new(config),
            stats: Arc::new(RwLock::new(ScheduleStats::default())),
            running: Arc::new(Mutex::new(())),
        })
    }

    pub async fn schedule(&self) -> Result<Uuid> {
        let cron = self.config.schedule.cron.clone();
        let config = Arc::clone(&self.config);
        let stats = Arc::clone(&self.stats);
        let running = Arc::clone(&self.running);

        let job = Job::new_async(cron.as_str(), move |_uuid, _l| {
            let config = Arc::clone(&config);
            let stats = Arc::clone(&stats);
            let running = Arc::clone(&running);

            Box::pin(async move {
                let Ok(_guard) = running.try_lock() else {
                    tracing::warn!("Previous batch still running; skipping this tick");
                    stats.write().await.skipped_overlaps += 1;
                    return;
                };
                Self::execute_scheduled_batch(&config, &stats).await;
            })
        })
        .with_context(|| format!("Invalid cron expression '{}'", cron))?;

        let id = self.scheduler.add(job).await?;
        tracing::info!("Scheduled filter batch with cron: {}", cron);
        Ok(id)
    }

    pub async fn start(&self) -> Result<()> {
        self.scheduler.start().await?;
        tracing::info!("Batch scheduler started");
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.scheduler.shutdown().await?;
        tracing::info!("Batch scheduler shutdown");
        Ok(())
    }

    pub async fn stats(&self) -> ScheduleStats {
        self.stats.read().await.clone()
    }

    /// Schedule, start and block until Ctrl-C.
    pub async fn run_until_ctrl_c(mut self) -> Result<()> {
        self.schedule().await?;
        self.start().await?;
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown requested");
        self.shutdown().await
    }

    async fn execute_scheduled_batch(config: &AppConfig, stats: &RwLock<ScheduleStats>) {
        let path = Path::new(&config.search.filters_path);
        let notifier = TelegramNotifier::new(config.telegram.clone());

        // The filters file is re-read on every tick so edits apply without a restart.
        let outcome = match load_filters_file(path) {
            Ok(loaded) => run_filters_once(config, &loaded.specs, &notifier).await,
            Err(err) => Err(anyhow::Error::new(err).context(format!("Failed to load {}", path.display()))),
        };

        let mut stats = stats.write().await;
        stats.runs += 1;
        stats.last_run_at = Some(Utc::now());
        match outcome {
            Ok(report) => {
                stats.last_run_id = Some(report.run_id);
                stats.failed_filters += report.failed() as u64;
                stats.last_error = None;
            }
            Err(err) => {
                tracing::error!("Scheduled batch failed: {:#}", err);
                stats.last_error = Some(format!("{:#}", err));
            }
        }
    }
}
