pub mod calendar;
pub mod config;
pub mod driver;
pub mod extractor;
pub mod filter;
pub mod formatter;
pub mod loader;
pub mod models;
pub mod plugins;
pub mod runner;
pub mod scheduler;
pub mod search;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
