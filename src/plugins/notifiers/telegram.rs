use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::TelegramConfig;
use crate::plugins::traits::{NotificationResult, Notifier};
use crate::utils::error::{AppError, Result};

/// Sends summaries through the Telegram Bot API `sendMessage` method.
pub struct TelegramNotifier {
    client: Client,
    config: TelegramConfig,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Self {
        TelegramNotifier {
            client: Client::new(),
            config,
        }
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        let token = self.config.bot_token.as_deref().filter(|t| !t.trim().is_empty());
        let chat_id = self.config.chat_id.as_deref().filter(|c| !c.trim().is_empty());

        match (token, chat_id) {
            (Some(token), Some(chat_id)) => Ok((token, chat_id)),
            (None, Some(_)) => Err(missing("bot token")),
            (Some(_), None) => Err(missing("chat id")),
            (None, None) => Err(missing("bot token and chat id")),
        }
    }

    fn endpoint(&self, token: &str) -> String {
        format!("{}/bot{}/sendMessage", self.config.api_base.trim_end_matches('/'), token)
    }

    fn create_payload(&self, chat_id: &str, text: &str) -> serde_json::Value {
        json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": self.config.parse_mode,
            "disable_web_page_preview": true
        })
    }
}

fn missing(what: &str) -> AppError {
    AppError::NotifierCredentialsMissing {
        missing: what.to_string(),
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, text: &str) -> Result<NotificationResult> {
        let (token, chat_id) = match self.credentials() {
            Ok(credentials) => credentials,
            Err(err) => {
                warn!("{}; message not sent", err);
                return Ok(NotificationResult::skipped());
            }
        };

        let response = self
            .client
            .post(self.endpoint(token))
            .json(&self.create_payload(chat_id, text))
            .send()
            .await?;

        let status = response.status();
        let body: serde_json::Value = response.json().await.unwrap_or(serde_json::Value::Null);

        if status.is_success() && body["ok"].as_bool().unwrap_or(false) {
            let message_id = body["result"]["message_id"].as_i64().map(|id| id.to_string());
            debug!("Telegram message delivered: {:?}", message_id);
            Ok(NotificationResult::delivered(message_id))
        } else {
            let description = body["description"].as_str().unwrap_or("no description");
            Ok(NotificationResult::failed(format!("Telegram returned {}: {}", status, description)))
        }
    }
}
