//! `DataCleanup` (spec §4.6, daily 03:00): purges notifications, expired
//! ValueBets, stale Odds/StockPrice history and revoked sessions.
//!
//! The twenty-entity data model (spec §3) has no AuditLog entity, so the
//! "audit logs > 90d" clause has nothing to act on here. The maintenance
//! hook is PostgreSQL-specific (`VACUUM ANALYZE`); this crate's storage
//! backend is sqlite (spec §1), so it runs `PRAGMA optimize` instead.

use crate::context::AppContext;
use crate::errors::EngineResult;
use crate::repo::Repository;
use async_trait::async_trait;
use chrono::Duration;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const NOTIFICATION_RETENTION_DAYS: i64 = 30;
const ODDS_RETENTION_DAYS: i64 = 30;
const STOCK_PRICE_RETENTION_DAYS: i64 = 365 * 2;
const REVOKED_SESSION_RETENTION_DAYS: i64 = 7;

pub struct DataCleanupWorker {
    ctx: Arc<AppContext>,
}

impl DataCleanupWorker {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl crate::workers::Worker for DataCleanupWorker {
    fn name(&self) -> &'static str {
        "DataCleanup"
    }

    async fn run(&self, _cancel: &CancellationToken) -> EngineResult<()> {
        let now = self.ctx.clock.now();

        let notification_cutoff = now - Duration::days(NOTIFICATION_RETENTION_DAYS);
        let notifications = self.ctx.repos.notifications.list().await?;
        let mut deleted = 0u32;
        for n in notifications {
            if n.created_at < notification_cutoff {
                self.ctx.repos.notifications.delete(&n.id).await?;
                deleted += 1;
            }
        }
        tracing::info!(deleted, "pruned stale notifications");

        let value_bets = self.ctx.repos.value_bets.list().await?;
        let mut deleted = 0u32;
        for vb in value_bets {
            if vb.expires_at <= now {
                self.ctx.repos.value_bets.delete(&vb.id).await?;
                deleted += 1;
            }
        }
        tracing::info!(deleted, "pruned expired value bets");

        let odds_cutoff = now - Duration::days(ODDS_RETENTION_DAYS);
        let odds = self.ctx.repos.odds.list().await?;
        let mut deleted = 0u32;
        for o in odds {
            if o.observed_at < odds_cutoff {
                self.ctx.repos.odds.delete(&o.id).await?;
                deleted += 1;
            }
        }
        tracing::info!(deleted, "pruned stale odds history");

        let price_cutoff = now - Duration::days(STOCK_PRICE_RETENTION_DAYS);
        let prices = self.ctx.repos.stock_prices.list().await?;
        let mut deleted = 0u32;
        for p in prices {
            if p.timestamp < price_cutoff {
                self.ctx.repos.stock_prices.delete(&p.id).await?;
                deleted += 1;
            }
        }
        tracing::info!(deleted, "pruned stale stock price history");

        let session_cutoff = now - Duration::days(REVOKED_SESSION_RETENTION_DAYS);
        let sessions = self.ctx.repos.sessions.list().await?;
        let mut deleted = 0u32;
        for s in sessions {
            if s.revoked_at.is_some_and(|revoked_at| revoked_at < session_cutoff) {
                self.ctx.repos.sessions.delete(&s.id).await?;
                deleted += 1;
            }
        }
        tracing::info!(deleted, "pruned revoked sessions");

        if let Err(e) = self.ctx.repos.run_maintenance().await {
            tracing::warn!(error = %e, "database maintenance hook failed");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::Worker;
    use crate::cache::CacheService;
    use crate::clock::FixedClock;
    use crate::config::{AppConfig, WorkerIntervals};
    use crate::context::{AppContext, Providers, Repos};
    use crate::domain::{Notification, Session, SessionId, UserId};
    use crate::hub::RealtimeHub;
    use crate::notify::Notifier;
    use chrono::{TimeZone, Utc};

    fn test_ctx(now: chrono::DateTime<Utc>) -> Arc<AppContext> {
        let config = Arc::new(AppConfig {
            env: "test".into(),
            port: 0,
            use_mock_data: true,
            log_level: "error".into(),
            database_url: ":memory:".into(),
            redis_url: None,
            pinnacle_api_key: None,
            betfair_app_key: None,
            betfair_session_token: None,
            alphavantage_api_key: None,
            newsapi_key: None,
            sendgrid_api_key: None,
            telegram_bot_token: None,
            line_channel_token: None,
            discord_webhook_url: None,
            backup_path: std::env::temp_dir(),
            backup_retention_days: 7,
            intervals: WorkerIntervals::default(),
            ensemble_weights: crate::risk::ensemble::EnsembleWeights::default(),
            liquid_leagues: vec!["epl".into()],
        });
        Arc::new(AppContext {
            providers: Arc::new(Providers::from_config(&config)),
            notifier: Arc::new(Notifier::from_config(&config)),
            cache: Arc::new(CacheService::new()),
            hub: RealtimeHub::spawn(),
            clock: Arc::new(FixedClock::new(now)),
            repos: Arc::new(Repos::in_memory()),
            config,
        })
    }

    #[tokio::test]
    async fn prunes_only_what_has_aged_past_each_retention_window() {
        let now = Utc.with_ymd_and_hms(2026, 2, 1, 3, 0, 0).unwrap();
        let ctx = test_ctx(now);

        let user_id = UserId::new();
        let mut stale_notification = Notification::new(user_id, "old".into(), "old body".into(), "in_app");
        stale_notification.created_at = now - Duration::days(NOTIFICATION_RETENTION_DAYS + 1);
        let mut fresh_notification = Notification::new(user_id, "new".into(), "new body".into(), "in_app");
        fresh_notification.created_at = now - Duration::days(1);
        ctx.repos.notifications.create(stale_notification).await.unwrap();
        ctx.repos.notifications.create(fresh_notification.clone()).await.unwrap();

        let stale_session = Session {
            id: SessionId::new(),
            user_id,
            refresh_token: "a".into(),
            expires_at: now,
            revoked_at: Some(now - Duration::days(REVOKED_SESSION_RETENTION_DAYS + 1)),
        };
        let recently_revoked_session = Session {
            id: SessionId::new(),
            user_id,
            refresh_token: "b".into(),
            expires_at: now,
            revoked_at: Some(now - Duration::days(1)),
        };
        ctx.repos.sessions.create(stale_session).await.unwrap();
        ctx.repos.sessions.create(recently_revoked_session.clone()).await.unwrap();

        let worker = DataCleanupWorker::new(ctx.clone());
        worker.run(&CancellationToken::new()).await.unwrap();

        let remaining_notifications = ctx.repos.notifications.list().await.unwrap();
        assert_eq!(remaining_notifications.len(), 1);
        assert_eq!(remaining_notifications[0].id, fresh_notification.id);

        let remaining_sessions = ctx.repos.sessions.list().await.unwrap();
        assert_eq!(remaining_sessions.len(), 1);
        assert_eq!(remaining_sessions[0].id, recently_revoked_session.id);
    }
}
