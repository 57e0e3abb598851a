//! Notification fan-out (spec §4.3): a polymorphic `Channel` variant over
//! `{email, telegram, line, discord}`, dispatched concurrently per alert
//! trigger with per-channel exponential-backoff retry. Grounded on the
//! teacher's provider-client HTTP-wrapper shape (`kalshi/client.rs`) for the
//! request plumbing, generalized to four outbound integrations instead of one.

pub mod channels;

use crate::config::AppConfig;
use crate::domain::{Notification, Settings};
use crate::errors::EngineResult;
use crate::repo::Repository;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// One outbound integration. `send` performs at most one network call.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &'static str;
    async fn send(&self, recipient: &str, message: &str) -> EngineResult<()>;
}

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE: Duration = Duration::from_secs(1);
const RETRY_CAP: Duration = Duration::from_secs(30);

/// Holds every configured channel implementation and dispatches concurrently
/// to a user's enabled channels (spec §4.3). Always writes an in-app
/// Notification row regardless of channel outcomes.
pub struct Notifier {
    email: Arc<dyn Channel>,
    telegram: Arc<dyn Channel>,
    line: Arc<dyn Channel>,
    discord: Arc<dyn Channel>,
}

impl Notifier {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            email: Arc::new(channels::EmailChannel::new(config.sendgrid_api_key.clone())),
            telegram: Arc::new(channels::TelegramChannel::new(config.telegram_bot_token.clone())),
            line: Arc::new(channels::LineChannel::new(config.line_channel_token.clone())),
            discord: Arc::new(channels::DiscordChannel::new(config.discord_webhook_url.clone())),
        }
    }

    /// Dispatches `title`/`body` to every channel the user's settings enable,
    /// each with independent exponential-backoff retry, then persists an
    /// always-on in-app Notification. Per-channel failures are logged and
    /// never propagate to the caller (spec §7: "notification channel
    /// failures are local to that channel").
    pub async fn notify<R: Repository<Notification>>(
        &self,
        notifications: &R,
        user_id: crate::domain::UserId,
        user_email: &str,
        settings: &Settings,
        title: &str,
        body: &str,
    ) -> EngineResult<Notification> {
        let mut sends = Vec::new();
        if settings.notify_email {
            sends.push(("email", self.email.clone(), user_email.to_string()));
        }
        if settings.notify_telegram {
            if let Some(chat_id) = &settings.telegram_chat_id {
                sends.push(("telegram", self.telegram.clone(), chat_id.clone()));
            }
        }
        if settings.notify_line {
            if let Some(token) = &settings.line_token {
                sends.push(("line", self.line.clone(), token.clone()));
            }
        }
        if settings.notify_discord {
            if let Some(webhook) = &settings.discord_webhook {
                sends.push(("discord", self.discord.clone(), webhook.clone()));
            }
        }

        let body_owned = body.to_string();
        let futures = sends.into_iter().map(|(name, channel, recipient)| {
            let message = body_owned.clone();
            async move {
                if let Err(e) = send_with_retry(channel.as_ref(), &recipient, &message).await {
                    tracing::error!(channel = name, error = %e, "notification delivery failed after retries");
                }
            }
        });
        futures_util::future::join_all(futures).await;

        let notification = Notification::new(user_id, title.to_string(), body.to_string(), "in_app");
        notifications.create(notification).await
    }
}

async fn send_with_retry(channel: &dyn Channel, recipient: &str, message: &str) -> EngineResult<()> {
    let mut delay = RETRY_BASE;
    for attempt in 1..=RETRY_ATTEMPTS {
        match channel.send(recipient, message).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt < RETRY_ATTEMPTS => {
                tracing::warn!(channel = channel.name(), attempt, error = %e, "retrying notification send");
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(RETRY_CAP);
            }
            Err(e) => return Err(e),
        }
    }
    unreachable!("loop always returns within RETRY_ATTEMPTS iterations")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::memory::InMemoryRepository;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyChannel {
        failures_before_success: u32,
        attempts: AtomicU32,
    }

    #[async_trait]
    impl Channel for FlakyChannel {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn send(&self, _recipient: &str, _message: &str) -> EngineResult<()> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.failures_before_success {
                Err(crate::errors::EngineError::Transient("simulated failure".into()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn retries_until_success_within_attempt_budget() {
        let channel = FlakyChannel {
            failures_before_success: 2,
            attempts: AtomicU32::new(0),
        };
        let result = send_with_retry(&channel, "x", "hello").await;
        assert!(result.is_ok());
        assert_eq!(channel.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_retry_budget_exhausted() {
        let channel = FlakyChannel {
            failures_before_success: 10,
            attempts: AtomicU32::new(0),
        };
        let result = send_with_retry(&channel, "x", "hello").await;
        assert!(result.is_err());
        assert_eq!(channel.attempts.load(Ordering::SeqCst), RETRY_ATTEMPTS);
    }

    #[tokio::test]
    async fn in_app_notification_always_written_regardless_of_channel_outcome() {
        let notifier = Notifier {
            email: Arc::new(channels::EmailChannel::new(None)),
            telegram: Arc::new(channels::TelegramChannel::new(None)),
            line: Arc::new(channels::LineChannel::new(None)),
            discord: Arc::new(channels::DiscordChannel::new(None)),
        };
        let repo = crate::repo::Backend::Memory(InMemoryRepository::<Notification>::new());
        let mut settings = Settings::default();
        settings.notify_email = false;
        settings.notify_telegram = false;
        settings.notify_line = false;
        settings.notify_discord = false;
        let notification = notifier
            .notify(&repo, settings.user_id, "user@example.test", &settings, "Alert", "body")
            .await
            .unwrap();
        assert_eq!(notification.channel, "in_app");
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }
}
