use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid filter row {row} ({name}): {message}")]
    ConfigRowInvalid {
        row: usize,
        name: String,
        message: String,
    },

    #[error("Calendar month '{label}' not reachable after {attempts} attempts")]
    CalendarTargetNotFound { label: String, attempts: usize },

    #[error("Timed out after {timeout_ms}ms waiting for {step}")]
    StepTimeout { step: String, timeout_ms: u64 },

    #[error("Unparseable offer date: {text}")]
    OfferDateUnparseable { text: String },

    #[error("Notifier credentials missing: {missing}")]
    NotifierCredentialsMissing { missing: String },

    #[error("Browser driver error: {0}")]
    Driver(String),

    #[error("Element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Filters file error: {0}")]
    FilterFile(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(format!("{}", err))
    }
}

impl AppError {
    pub fn driver(err: impl std::fmt::Display) -> Self {
        AppError::Driver(err.to_string())
    }

    /// Errors that end the current filter but leave the batch running.
    pub fn is_filter_scoped(&self) -> bool {
        matches!(
            self,
            AppError::CalendarTargetNotFound { .. }
                | AppError::StepTimeout { .. }
                | AppError::Driver(_)
                | AppError::ElementNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
