//! Concrete `Channel` implementations, one per external integration. Each
//! follows the teacher's `kalshi::client` shape: a `reqwest::Client`, an
//! optional credential, and a response-status classification into
//! `EngineError` (spec §4.1 point 4, reapplied to outbound notification
//! calls rather than inbound provider calls).

use super::Channel;
use crate::errors::{EngineError, EngineResult};
use async_trait::async_trait;
use std::time::Duration;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(SEND_TIMEOUT)
        .build()
        .expect("reqwest client builds with a static timeout")
}

fn classify(status: reqwest::StatusCode, body: String) -> EngineError {
    EngineError::ProviderError {
        status: status.as_u16(),
        body,
    }
}

pub struct EmailChannel {
    api_key: Option<String>,
    client: reqwest::Client,
}

impl EmailChannel {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            client: http_client(),
        }
    }
}

#[async_trait]
impl Channel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(&self, recipient: &str, message: &str) -> EngineResult<()> {
        let Some(api_key) = &self.api_key else {
            return Err(EngineError::Config("SENDGRID_API_KEY not configured".into()));
        };
        let response = self
            .client
            .post("https://api.sendgrid.com/v3/mail/send")
            .bearer_auth(api_key)
            .json(&serde_json::json!({
                "personalizations": [{"to": [{"email": recipient}]}],
                "content": [{"type": "text/plain", "value": message}],
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(classify(status, response.text().await.unwrap_or_default()));
        }
        Ok(())
    }
}

pub struct TelegramChannel {
    bot_token: Option<String>,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: Option<String>) -> Self {
        Self {
            bot_token,
            client: http_client(),
        }
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, recipient: &str, message: &str) -> EngineResult<()> {
        let Some(token) = &self.bot_token else {
            return Err(EngineError::Config("TELEGRAM_BOT_TOKEN not configured".into()));
        };
        let url = format!("https://api.telegram.org/bot{token}/sendMessage");
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({"chat_id": recipient, "text": message}))
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(classify(status, response.text().await.unwrap_or_default()));
        }
        Ok(())
    }
}

pub struct LineChannel {
    channel_token: Option<String>,
    client: reqwest::Client,
}

impl LineChannel {
    pub fn new(channel_token: Option<String>) -> Self {
        Self {
            channel_token,
            client: http_client(),
        }
    }
}

#[async_trait]
impl Channel for LineChannel {
    fn name(&self) -> &'static str {
        "line"
    }

    async fn send(&self, recipient: &str, message: &str) -> EngineResult<()> {
        let Some(token) = &self.channel_token else {
            return Err(EngineError::Config("LINE_CHANNEL_TOKEN not configured".into()));
        };
        let response = self
            .client
            .post("https://api.line.me/v2/bot/message/push")
            .bearer_auth(token)
            .json(&serde_json::json!({
                "to": recipient,
                "messages": [{"type": "text", "text": message}],
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(classify(status, response.text().await.unwrap_or_default()));
        }
        Ok(())
    }
}

pub struct DiscordChannel {
    webhook_url: Option<String>,
    client: reqwest::Client,
}

impl DiscordChannel {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            webhook_url,
            client: http_client(),
        }
    }
}

#[async_trait]
impl Channel for DiscordChannel {
    fn name(&self) -> &'static str {
        "discord"
    }

    /// `recipient` is unused -- a Discord webhook URL already encodes the
    /// destination channel, so the configured `webhook_url` takes priority
    /// and falls back to the caller-provided recipient for per-user webhooks.
    async fn send(&self, recipient: &str, message: &str) -> EngineResult<()> {
        let url = self
            .webhook_url
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| recipient.to_string());
        if url.is_empty() {
            return Err(EngineError::Config("no discord webhook configured".into()));
        }
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({"content": message}))
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(classify(status, response.text().await.unwrap_or_default()));
        }
        Ok(())
    }
}
