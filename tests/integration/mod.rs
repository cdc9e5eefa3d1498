// Shared fixtures for batch tests: a scripted search page and a recording notifier.

pub mod batch_tests;
pub mod loader_tests;

use async_trait::async_trait;
use chrono::{Months, NaiveDate};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fare_watcher::AppConfig;
use fare_watcher::config::{BrowserConfig, SearchConfig, SiteConfig, TelegramConfig};
use fare_watcher::driver::UiDriver;
use fare_watcher::models::MonthYear;
use fare_watcher::plugins::{NotificationResult, Notifier};
use fare_watcher::utils::error::{AppError, Result};

/// What the page shows after submitting a search from a given origin.
#[derive(Debug, Clone)]
pub enum Scenario {
    Results(String),
    Empty,
    /// Neither results nor the empty marker ever appear.
    Hang,
}

#[derive(Debug, Default)]
struct PageState {
    origin: Option<String>,
    /// Field whose suggestion list is open.
    typing: Option<String>,
    calendar_open: bool,
    month_offset: u32,
    options_open: bool,
    submitted: bool,
}

/// In-memory stand-in for the search page.
///
/// The calendar opens on `calendar_start` and pages one month per click on
/// the next arrow. Results depend on the origin typed into the form.
pub struct ScriptedSite {
    pub site: SiteConfig,
    calendar_start: NaiveDate,
    scenarios: HashMap<String, Scenario>,
    state: Mutex<PageState>,
    pub actions: Mutex<Vec<String>>,
    pub screenshots: Mutex<Vec<PathBuf>>,
}

impl ScriptedSite {
    pub fn new(calendar_start: NaiveDate) -> Self {
        Self {
            site: SiteConfig::default(),
            calendar_start,
            scenarios: HashMap::new(),
            state: Mutex::new(PageState::default()),
            actions: Mutex::new(Vec::new()),
            screenshots: Mutex::new(Vec::new()),
        }
    }

    pub fn with_scenario(mut self, origin: &str, scenario: Scenario) -> Self {
        self.scenarios.insert(origin.to_string(), scenario);
        self
    }

    pub fn actions(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }

    fn record(&self, action: String) {
        self.actions.lock().unwrap().push(action);
    }

    fn pane_label(&self, state: &PageState, extra: u32) -> String {
        let shown = self
            .calendar_start
            .checked_add_months(Months::new(state.month_offset + extra))
            .unwrap();
        MonthYear::of(shown).label()
    }

    /// Input field a suggestion-list selector belongs to.
    fn suggestion_field(&self, selector: &str) -> Option<&str> {
        if selector == self.site.origin_suggestions {
            Some(self.site.origin_input.as_str())
        } else if selector == self.site.destination_suggestions {
            Some(self.site.destination_input.as_str())
        } else {
            None
        }
    }

    fn scenario(&self, state: &PageState) -> Scenario {
        state
            .origin
            .as_ref()
            .and_then(|origin| self.scenarios.get(origin))
            .cloned()
            .unwrap_or(Scenario::Empty)
    }
}

#[async_trait]
impl UiDriver for ScriptedSite {
    async fn navigate(&self, url: &str) -> Result<()> {
        *self.state.lock().unwrap() = PageState::default();
        self.record(format!("navigate {}", url));
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if selector == self.site.origin_input {
            state.origin = Some(text.to_string());
        }
        state.typing = Some(selector.to_string());
        self.record(format!("type {} {}", selector, text));
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        self.record(format!("fill {} {}", selector, value));
        Ok(())
    }

    async fn select_dropdown(&self, selector: &str, value: &str) -> Result<()> {
        self.record(format!("select {} {}", selector, value));
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let site = &self.site;
        if let Some(field) = self.suggestion_field(selector) {
            if state.typing.as_deref() != Some(field) {
                return Err(AppError::Driver(format!("No open suggestions for {}", field)));
            }
            state.typing = None;
        } else if selector == site.departure_range_input || selector == site.return_range_input {
            state.calendar_open = true;
            state.month_offset = 0;
        } else if selector == site.calendar_next {
            state.month_offset += 1;
        } else if selector == site.calendar_apply {
            state.calendar_open = false;
        } else if selector == site.submit_button {
            state.submitted = true;
        }
        self.record(format!("click {}", selector));
        Ok(())
    }

    async fn click_text(&self, selector: &str, text: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let site = &self.site;
        if selector == site.options_toggle && text == site.options_toggle_text {
            state.options_open = true;
            self.record(format!("click_text {}", text));
        } else if selector == site.calendar_left_days || selector == site.calendar_right_days {
            let extra = u32::from(selector == site.calendar_right_days);
            let label = self.pane_label(&state, extra);
            self.record(format!("pick {} {}", text, label));
        } else {
            return Err(AppError::ElementNotFound {
                selector: format!("{} '{}'", selector, text),
            });
        }
        Ok(())
    }

    async fn read_text(&self, selector: &str) -> Result<String> {
        let state = self.state.lock().unwrap();
        if selector == self.site.calendar_left_month {
            Ok(self.pane_label(&state, 0))
        } else if selector == self.site.calendar_right_month {
            Ok(self.pane_label(&state, 1))
        } else {
            Err(AppError::ElementNotFound {
                selector: selector.to_string(),
            })
        }
    }

    async fn read_all_text(&self, _selector: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn is_present(&self, selector: &str) -> Result<bool> {
        let state = self.state.lock().unwrap();
        let site = &self.site;
        let present = if selector == site.origin_input {
            true
        } else if let Some(field) = self.suggestion_field(selector) {
            state.typing.as_deref() == Some(field)
        } else if selector == site.calendar {
            state.calendar_open
        } else if selector == site.limit_select {
            state.options_open
        } else if selector == site.result_card {
            state.submitted && matches!(self.scenario(&state), Scenario::Results(_))
        } else if selector == site.empty_results {
            state.submitted && matches!(self.scenario(&state), Scenario::Empty)
        } else {
            false
        };
        Ok(present)
    }

    async fn content(&self) -> Result<String> {
        let state = self.state.lock().unwrap();
        match self.scenario(&state) {
            Scenario::Results(html) => Ok(html),
            _ => Ok("<html><body><div class=\"flights-list\"></div></body></html>".to_string()),
        }
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        self.screenshots.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

/// Notifier that keeps every message it is asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, text: &str) -> Result<NotificationResult> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(NotificationResult::delivered(None))
    }
}

/// Test configuration with short waits.
pub fn get_test_config() -> AppConfig {
    AppConfig {
        browser: BrowserConfig {
            headless: true,
            chrome_path: None,
            window_width: 1280,
            window_height: 800,
            user_agent: None,
            screenshot_on_failure: true,
            screenshot_dir: "target/test-screenshots".to_string(),
        },
        site: SiteConfig::default(),
        search: SearchConfig {
            step_timeout_ms: 50,
            results_timeout_ms: 50,
            poll_interval_ms: 5,
            calendar_max_advances: 12,
            excluded_airports: vec!["PFO".to_string(), "LCA".to_string(), "TLV".to_string(), "AMM".to_string()],
            filters_path: "config/filters.toml".to_string(),
        },
        telegram: TelegramConfig {
            bot_token: None,
            chat_id: None,
            api_base: "https://api.telegram.org".to_string(),
            parse_mode: "HTML".to_string(),
        },
        schedule: Default::default(),
        logging: Default::default(),
    }
}

/// One result card in the markup the default selectors expect.
pub fn card(price: &str, segments: &[(&str, &str, &str)]) -> String {
    let dates: String = segments
        .iter()
        .map(|(date, time, _)| {
            format!(
                r#"<div class="col-md-3"><small class="text-muted">{}</small><span class="reduced">{}</span></div>"#,
                date, time
            )
        })
        .collect();
    let routes: String = segments
        .iter()
        .map(|(_, _, route)| format!(r#"<div class="col-md-5"><small class="text-muted">{}</small></div>"#, route))
        .collect();
    format!(r#"<div class="flight"><span class="price">{}</span>{}{}</div>"#, price, dates, routes)
}

pub fn results_page(cards: &[String]) -> String {
    format!(
        r#"<html><body><div class="flights-list">{}</div></body></html>"#,
        cards.join("")
    )
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
