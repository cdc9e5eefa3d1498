use serde::Serialize;
use std::path::PathBuf;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::driver::UiDriver;
use crate::extractor::ResultExtractor;
use crate::filter::{ExcludedAirports, FilterStats, ResultFilter};
use crate::formatter::render_messages;
use crate::models::{FilterSpec, FlightOffer};
use crate::plugins::Notifier;
use crate::search::{SearchExecutor, SearchOutcome};
use crate::utils::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum FilterStatus {
    /// At least one summary message was delivered.
    Notified,
    /// The search worked but nothing survived filtering, so nothing was sent.
    Silent,
    /// Messages were rendered but none could be delivered.
    Undelivered,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterReport {
    pub name: String,
    pub status: FilterStatus,
    pub offers_found: usize,
    pub offers_kept: usize,
    pub messages_sent: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub filters: Vec<FilterReport>,
}

impl BatchReport {
    pub fn count(&self, wanted: fn(&FilterStatus) -> bool) -> usize {
        self.filters.iter().filter(|f| wanted(&f.status)).count()
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, FilterStatus::Failed(_)))
    }
}

/// Runs filters one at a time against a shared browser session.
pub struct Runner<'a> {
    driver: &'a dyn UiDriver,
    notifier: &'a dyn Notifier,
    config: &'a AppConfig,
    excluded: ExcludedAirports,
}

impl<'a> Runner<'a> {
    pub fn new(driver: &'a dyn UiDriver, notifier: &'a dyn Notifier, config: &'a AppConfig) -> Self {
        Self {
            driver,
            notifier,
            config,
            excluded: ExcludedAirports::new(&config.search.excluded_airports),
        }
    }

    /// Process every filter in order. A failing filter is logged and skipped.
    pub async fn run_batch(&self, specs: &[FilterSpec]) -> BatchReport {
        let run_id = Uuid::new_v4();

        async {
            info!("Starting batch of {} filters", specs.len());
            let mut filters = Vec::with_capacity(specs.len());
            for spec in specs {
                let report = self
                    .run_filter(spec)
                    .instrument(info_span!("filter", name = %spec.name))
                    .await;
                filters.push(report);
            }

            let report = BatchReport { run_id, filters };
            info!(
                "Batch finished: {} notified, {} silent, {} undelivered, {} failed",
                report.count(|s| *s == FilterStatus::Notified),
                report.count(|s| *s == FilterStatus::Silent),
                report.count(|s| *s == FilterStatus::Undelivered),
                report.failed()
            );
            report
        }
        .instrument(info_span!("batch", %run_id))
        .await
    }

    pub async fn run_filter(&self, spec: &FilterSpec) -> FilterReport {
        let mut report = FilterReport {
            name: spec.name.clone(),
            status: FilterStatus::Silent,
            offers_found: 0,
            offers_kept: 0,
            messages_sent: 0,
        };

        let offers = match self.search_and_extract(spec).await {
            Ok(offers) => offers,
            Err(err) => {
                error!("Filter '{}' failed: {}", spec.name, err);
                if err.is_filter_scoped() {
                    self.capture_failure(spec).await;
                }
                report.status = FilterStatus::Failed(err.to_string());
                return report;
            }
        };
        report.offers_found = offers.len();

        let (kept, FilterStats { kept: kept_count, .. }) = ResultFilter::new(&self.excluded).apply(spec, offers);
        report.offers_kept = kept_count;

        let messages = render_messages(spec, kept);
        if messages.is_empty() {
            info!("No offers left for '{}'; nothing to send", spec.name);
            return report;
        }

        report.messages_sent = self.deliver(&messages).await;
        report.status = if report.messages_sent > 0 {
            FilterStatus::Notified
        } else {
            FilterStatus::Undelivered
        };
        report
    }

    async fn search_and_extract(&self, spec: &FilterSpec) -> Result<Vec<FlightOffer>> {
        let executor = SearchExecutor::new(self.driver, &self.config.site, &self.config.search);
        if executor.execute(spec).await? == SearchOutcome::Empty {
            info!("Site reported no flights for '{}'", spec.name);
            return Ok(Vec::new());
        }

        let html = self.driver.content().await?;
        let extractor = ResultExtractor::new(&self.config.site)?;
        Ok(extractor.extract(&html, spec.max_results as usize))
    }

    /// Send each message; failures are logged and never stop the batch.
    async fn deliver(&self, messages: &[String]) -> usize {
        let mut sent = 0;
        for message in messages {
            match self.notifier.send(message).await {
                Ok(result) if result.delivered => sent += 1,
                Ok(result) if result.skipped => {}
                Ok(result) => warn!(
                    "Notification not delivered: {}",
                    result.error.as_deref().unwrap_or("unknown error")
                ),
                Err(err) => warn!("Notification failed: {}", err),
            }
        }
        sent
    }

    async fn capture_failure(&self, spec: &FilterSpec) {
        let browser = &self.config.browser;
        if !browser.screenshot_on_failure {
            return;
        }

        let slug: String = spec
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = PathBuf::from(&browser.screenshot_dir).join(format!("{}_{}.png", slug, timestamp));

        match self.driver.screenshot(&path).await {
            Ok(()) => info!("Saved failure screenshot to {}", path.display()),
            Err(err) => warn!("Could not save failure screenshot: {}", err),
        }
    }
}
