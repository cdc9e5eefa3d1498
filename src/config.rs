use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use url::Url;
use validator::Validate;

use crate::utils::retry::PollPolicy;

/// Airports whose offers are never wanted, matched case-insensitively against route text.
pub const DEFAULT_EXCLUDED_AIRPORTS: &[&str] = &["PFO", "LCA", "TLV", "AMM"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub browser: BrowserConfig,
    #[serde(default)]
    pub site: SiteConfig,
    pub search: SearchConfig,
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub headless: bool,
    pub chrome_path: Option<String>,
    pub window_width: u32,
    pub window_height: u32,
    pub user_agent: Option<String>,
    pub screenshot_on_failure: bool,
    pub screenshot_dir: String,
}

/// Where things live on the search page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub base_url: String,
    pub origin_input: String,
    pub destination_input: String,
    pub origin_suggestions: String,
    pub destination_suggestions: String,
    pub one_way_option: String,
    pub return_option: String,
    pub departure_range_input: String,
    pub return_range_input: String,
    pub calendar: String,
    pub calendar_left_month: String,
    pub calendar_right_month: String,
    pub calendar_left_days: String,
    pub calendar_right_days: String,
    pub calendar_next: String,
    pub calendar_apply: String,
    pub currency_select: String,
    pub options_toggle: String,
    pub options_toggle_text: String,
    pub limit_select: String,
    pub budget_input: String,
    pub submit_button: String,
    pub result_card: String,
    pub empty_results: String,
    pub card_price: String,
    pub card_dates: String,
    pub card_times: String,
    pub card_routes: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.flightlist.io".to_string(),
            origin_input: "#from-input".to_string(),
            destination_input: "#to-input".to_string(),
            origin_suggestions: "#from-input ~ .easy-autocomplete-container .eac-item".to_string(),
            destination_suggestions: "#to-input ~ .easy-autocomplete-container .eac-item".to_string(),
            one_way_option: "label[for='oneway']".to_string(),
            return_option: "label[for='return']".to_string(),
            departure_range_input: "#deprange".to_string(),
            return_range_input: "#retrange".to_string(),
            calendar: ".daterangepicker".to_string(),
            calendar_left_month: ".daterangepicker .drp-calendar.left .month".to_string(),
            calendar_right_month: ".daterangepicker .drp-calendar.right .month".to_string(),
            calendar_left_days: ".daterangepicker .drp-calendar.left td.available:not(.off)".to_string(),
            calendar_right_days: ".daterangepicker .drp-calendar.right td.available:not(.off)".to_string(),
            calendar_next: ".daterangepicker .next.available".to_string(),
            calendar_apply: ".daterangepicker .applyBtn".to_string(),
            currency_select: "#currency".to_string(),
            options_toggle: "button".to_string(),
            options_toggle_text: "Additional Options".to_string(),
            limit_select: "#limit".to_string(),
            budget_input: "#budget".to_string(),
            submit_button: "#submit".to_string(),
            result_card: ".flights-list .flight".to_string(),
            empty_results: ".flights-list .no-results".to_string(),
            card_price: ".price".to_string(),
            card_dates: "div.col-md-3 small.text-muted".to_string(),
            card_times: ".col-md-3 span.reduced".to_string(),
            card_routes: ".col-md-5 small.text-muted".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SearchConfig {
    #[validate(range(min = 1))]
    pub step_timeout_ms: u64,
    #[validate(range(min = 1))]
    pub results_timeout_ms: u64,
    #[validate(range(min = 1, max = 10000))]
    pub poll_interval_ms: u64,
    #[validate(range(min = 1, max = 24))]
    pub calendar_max_advances: usize,
    #[serde(default = "default_excluded_airports")]
    pub excluded_airports: Vec<String>,
    pub filters_path: String,
}

impl SearchConfig {
    pub fn step_policy(&self) -> PollPolicy {
        PollPolicy::from_timeout(self.step_timeout_ms, self.poll_interval_ms)
    }

    pub fn results_policy(&self) -> PollPolicy {
        PollPolicy::from_timeout(self.results_timeout_ms, self.poll_interval_ms)
    }
}

fn default_excluded_airports() -> Vec<String> {
    DEFAULT_EXCLUDED_AIRPORTS.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    #[validate(url)]
    pub api_base: String,
    pub parse_mode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub cron: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: "0 0 7 * * *".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub directory: Option<String>,
    pub file_prefix: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default"))
            // Add environment-specific config
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add local config (ignored by git)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with prefix "FARE_"
            .add_source(Environment::with_prefix("FARE").separator("__"))
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        if config.browser.chrome_path.is_none() {
            config.browser.chrome_path = env::var("CHROME_PATH").ok();
        }
        if config.telegram.bot_token.is_none() {
            config.telegram.bot_token = env::var("TELEGRAM_BOT_TOKEN").ok();
        }
        if config.telegram.chat_id.is_none() {
            config.telegram.chat_id = env::var("TELEGRAM_CHAT_ID").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.browser.window_width == 0 || self.browser.window_height == 0 {
            return Err(ConfigError::Message("Browser window size must be greater than 0".into()));
        }

        if Url::parse(&self.site.base_url).is_err() {
            return Err(ConfigError::Message("Invalid site base URL format".into()));
        }

        self.search
            .validate()
            .map_err(|e| ConfigError::Message(format!("Invalid search configuration: {}", e)))?;

        if self.search.step_timeout_ms < self.search.poll_interval_ms {
            return Err(ConfigError::Message("Search step_timeout_ms cannot be shorter than poll_interval_ms".into()));
        }

        if self.search.filters_path.trim().is_empty() {
            return Err(ConfigError::Message("Search filters_path must not be empty".into()));
        }

        self.telegram
            .validate()
            .map_err(|e| ConfigError::Message(format!("Invalid telegram configuration: {}", e)))?;

        if self.schedule.cron.split_whitespace().count() != 6 {
            return Err(ConfigError::Message("Invalid cron expression in schedule.cron (expected 6 fields)".into()));
        }

        Ok(())
    }
}
