use super::Notifier;
use crate::config::TelegramConfig;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::*;
use reqwest::Client;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    base_url: String,
    token: String,
    chat_id: String,
    client: Client,
}

impl TelegramNotifier {
    /// `None` when the configuration lacks a token or chat id.
    pub fn from_config(config: &TelegramConfig) -> Result<Option<Self>> {
        let (token, chat_id) = match config.credentials() {
            Some(credentials) => credentials,
            None => return Ok(None),
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Some(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            chat_id: chat_id.to_string(),
            client,
        }))
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.base_url, self.token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, message: &str) -> Result<()> {
        let params = [
            ("chat_id", self.chat_id.as_str()),
            ("text", message),
            ("parse_mode", "HTML"),
        ];

        let response = self
            .client
            .post(self.send_message_url())
            .form(&params)
            .send()
            .await
            .context("Failed to send Telegram message")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Telegram rejected message with status {}: {}", status, error_text));
        }

        info!("Telegram message delivered");
        Ok(())
    }
}
