//! Telegram Bot API transport

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use super::Notifier;
use crate::error::{Result, RosterError};
use crate::state::ChatId;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Bot API settings
#[derive(Clone, Debug)]
pub struct TelegramConfig {
    pub api_url: String,
    pub bot_token: String,
    pub timeout: Duration,
}

impl TelegramConfig {
    /// Read from environment; `None` when no bot token is configured
    pub fn from_env(timeout: Duration) -> Option<Self> {
        let bot_token = std::env::var("BOT_TOKEN").ok().filter(|t| !t.is_empty())?;
        let api_url =
            std::env::var("BOT_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        Some(Self {
            api_url,
            bot_token,
            timeout,
        })
    }

    pub fn send_message_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_url.trim_end_matches('/'),
            self.bot_token
        )
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a ChatId,
    text: &'a str,
}

pub struct TelegramNotifier {
    url: String,
    http_client: reqwest::Client,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            url: config.send_message_url(),
            http_client,
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, chat_id: &ChatId, text: &str) -> Result<()> {
        let response = self
            .http_client
            .post(&self.url)
            .json(&SendMessage { chat_id, text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RosterError::NotifyRejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

/// Stand-in used when no bot token is configured; every send fails
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send(&self, _chat_id: &ChatId, _text: &str) -> Result<()> {
        Err(RosterError::NotifierDisabled)
    }
}
