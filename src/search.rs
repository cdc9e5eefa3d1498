use tracing::{debug, info};

use crate::calendar::CalendarNavigator;
use crate::config::{SearchConfig, SiteConfig};
use crate::driver::UiDriver;
use crate::models::{DateRange, FilterSpec, TripType};
use crate::utils::error::{AppError, Result};
use crate::utils::retry::poll_until;

/// What the results page showed once the search settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Results,
    Empty,
}

/// Fills in and submits the search form for one filter.
pub struct SearchExecutor<'a> {
    driver: &'a dyn UiDriver,
    site: &'a SiteConfig,
    search: &'a SearchConfig,
}

impl<'a> SearchExecutor<'a> {
    pub fn new(driver: &'a dyn UiDriver, site: &'a SiteConfig, search: &'a SearchConfig) -> Self {
        Self { driver, site, search }
    }

    /// Run the search form for `spec` and wait until results or the empty marker appear.
    pub async fn execute(&self, spec: &FilterSpec) -> Result<SearchOutcome> {
        let step_policy = self.search.step_policy();
        let site = self.site;

        debug!("Opening {}", site.base_url);
        self.driver.navigate(&site.base_url).await?;
        self.driver
            .wait_for(&site.origin_input, step_policy)
            .await
            .map_err(named("search form"))?;

        info!("Selecting origin: {}", spec.origin);
        self.driver
            .type_into_autocomplete(&site.origin_input, &spec.origin, &site.origin_suggestions, step_policy)
            .await
            .map_err(named("origin autocomplete"))?;

        if let Some(destination) = &spec.destination {
            info!("Selecting destination: {}", destination);
            self.driver
                .type_into_autocomplete(&site.destination_input, destination, &site.destination_suggestions, step_policy)
                .await
                .map_err(named("destination autocomplete"))?;
        }

        info!("Selecting trip type: {}", spec.trip.label());
        let trip_option = match spec.trip {
            TripType::OneWay => &site.one_way_option,
            TripType::Return { .. } => &site.return_option,
        };
        self.driver.click(trip_option).await?;

        info!("Selecting departure dates: {}", spec.departure);
        self.pick_range(&site.departure_range_input, &spec.departure).await?;

        if let Some(return_range) = spec.trip.return_range() {
            info!("Selecting return dates: {}", return_range);
            self.pick_range(&site.return_range_input, return_range).await?;
        }

        info!("Selecting currency: {}", spec.currency);
        self.driver.select_dropdown(&site.currency_select, &spec.currency).await?;

        debug!("Expanding additional options");
        self.driver
            .click_text(&site.options_toggle, &site.options_toggle_text)
            .await?;
        self.driver
            .wait_for(&site.limit_select, step_policy)
            .await
            .map_err(named("additional options"))?;

        info!("Limiting to {} results under {} {}", spec.max_results, spec.max_budget, spec.currency);
        self.driver
            .select_dropdown(&site.limit_select, &spec.max_results.to_string())
            .await?;
        self.driver.fill(&site.budget_input, &spec.max_budget.to_string()).await?;

        info!("Submitting search");
        self.driver.click(&site.submit_button).await?;

        self.wait_for_results().await
    }

    async fn pick_range(&self, input: &str, range: &DateRange) -> Result<()> {
        self.driver.click(input).await?;
        self.driver
            .wait_for(&self.site.calendar, self.search.step_policy())
            .await
            .map_err(named("date picker"))?;

        let navigator = CalendarNavigator::new(
            self.driver,
            self.site,
            self.search.calendar_max_advances,
            self.search.step_policy().interval(),
        );
        navigator.pick_range(range).await?;

        self.driver.click(&self.site.calendar_apply).await
    }

    /// Either the populated list or the empty marker ends the wait.
    async fn wait_for_results(&self) -> Result<SearchOutcome> {
        let driver = self.driver;
        let site = self.site;

        let outcome = poll_until("search results", self.search.results_policy(), move || async move {
            if driver.is_present(&site.result_card).await? {
                return Ok(Some(SearchOutcome::Results));
            }
            if driver.is_present(&site.empty_results).await? {
                return Ok(Some(SearchOutcome::Empty));
            }
            Ok(None)
        })
        .await?;

        info!("Search finished: {:?}", outcome);
        Ok(outcome)
    }
}

/// Name a timeout after the step that produced it.
fn named(step: &str) -> impl FnOnce(AppError) -> AppError + '_ {
    move |err| match err {
        AppError::StepTimeout { timeout_ms, .. } => AppError::StepTimeout {
            step: step.to_string(),
            timeout_ms,
        },
        other => other,
    }
}
