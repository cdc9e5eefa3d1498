use async_trait::async_trait;
use std::io::Write;

use crate::plugins::traits::{NotificationResult, Notifier};
use crate::utils::error::Result;

/// Prints summaries instead of sending them. Used for dry runs.
#[derive(Debug, Default)]
pub struct StdoutNotifier;

#[async_trait]
impl Notifier for StdoutNotifier {
    fn name(&self) -> &'static str {
        "stdout"
    }

    async fn send(&self, text: &str) -> Result<NotificationResult> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}\n", text)?;
        Ok(NotificationResult::delivered(None))
    }
}
