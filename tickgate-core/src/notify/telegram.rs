//! Telegram Bot API sink.

use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::NotifyError;
use crate::config::TelegramCredentials;
use crate::engine::ports::Notifier;

const API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

pub struct TelegramNotifier {
    client: reqwest::blocking::Client,
    credentials: TelegramCredentials,
    api_base: String,
}

impl TelegramNotifier {
    pub fn new(credentials: TelegramCredentials, timeout_secs: u64) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| NotifyError::Network(e.to_string()))?;
        Ok(Self {
            client,
            credentials,
            api_base: API_BASE.to_string(),
        })
    }

    /// Point at another Bot API host.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.credentials.bot_token)
    }
}

impl Notifier for TelegramNotifier {
    fn notify(&self, text: &str) -> Result<(), NotifyError> {
        let payload = SendMessage {
            chat_id: &self.credentials.chat_id,
            text,
        };
        let response = self
            .client
            .post(self.send_message_url())
            .json(&payload)
            .send()
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            warn!(status = status.as_u16(), %body, "telegram rejected message");
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        debug!(chars = text.len(), "telegram message sent");
        Ok(())
    }
}
