use chrono::Datelike;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::config::SiteConfig;
use crate::driver::UiDriver;
use crate::models::{DateRange, MonthYear};
use crate::utils::error::{AppError, Result};
use crate::utils::retry::{PollPolicy, poll_until};

/// One of the two month panes shown side by side by the date picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Left,
    Right,
}

/// Finds months in a two-pane date picker that can only page forward.
pub struct CalendarNavigator<'a> {
    driver: &'a dyn UiDriver,
    site: &'a SiteConfig,
    max_advances: usize,
    settle: Duration,
}

impl<'a> CalendarNavigator<'a> {
    pub fn new(driver: &'a dyn UiDriver, site: &'a SiteConfig, max_advances: usize, settle: Duration) -> Self {
        Self {
            driver,
            site,
            max_advances,
            settle,
        }
    }

    /// Page forward until `target` shows in either pane, at most `max_advances` times.
    pub async fn locate(&self, target: MonthYear) -> Result<Pane> {
        let label = target.label();
        let policy = PollPolicy::new(self.max_advances + 1, self.settle);
        let counter = AtomicUsize::new(0);
        let advances = &counter;
        let wanted = label.as_str();

        let outcome = poll_until(&format!("calendar month {}", label), policy, move || async move {
            let left = self.driver.read_text(&self.site.calendar_left_month).await?;
            if same_month_label(&left, wanted) {
                return Ok(Some(Pane::Left));
            }
            let right = self.driver.read_text(&self.site.calendar_right_month).await?;
            if same_month_label(&right, wanted) {
                return Ok(Some(Pane::Right));
            }

            debug!("Calendar shows {} / {}, looking for {}", left.trim(), right.trim(), wanted);
            if advances.load(Ordering::SeqCst) < self.max_advances {
                self.driver.click(&self.site.calendar_next).await?;
                advances.fetch_add(1, Ordering::SeqCst);
            }
            Ok(None)
        })
        .await;

        match outcome {
            Err(AppError::StepTimeout { .. }) => Err(AppError::CalendarTargetNotFound {
                label,
                attempts: policy.attempts(),
            }),
            other => other,
        }
    }

    pub async fn pick_day(&self, pane: Pane, day: u32) -> Result<()> {
        let cells = match pane {
            Pane::Left => &self.site.calendar_left_days,
            Pane::Right => &self.site.calendar_right_days,
        };
        self.driver.click_text(cells, &day.to_string()).await
    }

    /// Select both endpoints of `range`, paging again when the end lies in a later month.
    pub async fn pick_range(&self, range: &DateRange) -> Result<()> {
        let pane = self.locate(range.from_month()).await?;
        self.pick_day(pane, range.from.day()).await?;

        let pane = if range.spans_months() {
            self.locate(range.to_month()).await?
        } else {
            pane
        };
        self.pick_day(pane, range.to.day()).await
    }
}

fn same_month_label(shown: &str, wanted: &str) -> bool {
    let shown: Vec<&str> = shown.split_whitespace().collect();
    let wanted: Vec<&str> = wanted.split_whitespace().collect();
    shown.len() == wanted.len() && shown.iter().zip(&wanted).all(|(a, b)| a.eq_ignore_ascii_case(b))
}
