//! Alert engine (spec §4.7, C7): evaluates every active alert each tick
//! against the freshest resolvable value and dispatches triggers through the
//! notifier and the hub. Grounded on the odds-ingestion example's
//! alert/webhook dispatch shape, generalized to nine alert types.

pub mod condition;

use crate::clock::SharedClock;
use crate::context::Repos;
use crate::domain::{Alert, AlertType};
use crate::hub::RealtimeHub;
use crate::notify::Notifier;
use crate::repo::{entities as queries, Repository};
use crate::workers::Worker;
use async_trait::async_trait;
use condition::evaluate;
use rust_decimal::prelude::ToPrimitive;
use std::sync::Arc;

pub struct AlertEngine {
    repos: Arc<Repos>,
    notifier: Arc<Notifier>,
    hub: RealtimeHub,
    clock: SharedClock,
}

impl AlertEngine {
    pub fn new(repos: Arc<Repos>, notifier: Arc<Notifier>, hub: RealtimeHub, clock: SharedClock) -> Self {
        Self {
            repos,
            notifier,
            hub,
            clock,
        }
    }

    /// One tick of the engine (spec §4.7 steps 1-5). Never fails outright;
    /// per-alert errors are logged and skipped (spec §7).
    pub async fn tick(&self) {
        let active = match queries::active_alerts(self.repos.alerts.as_ref()).await {
            Ok(alerts) => alerts,
            Err(e) => {
                tracing::error!(error = %e, "failed to load active alerts");
                return;
            }
        };

        for alert in active {
            if let Err(e) = self.evaluate_one(alert).await {
                tracing::error!(error = %e, "alert evaluation failed");
            }
        }
    }

    async fn evaluate_one(&self, mut alert: Alert) -> crate::errors::EngineResult<()> {
        let current_value = match self.resolve_current_value(&alert).await? {
            Some(v) => v,
            None => {
                tracing::debug!(alert_id = %alert.id, "current value not available, skipping");
                return Ok(());
            }
        };

        let triggered = evaluate(alert.condition, alert.previous_value, current_value, alert.target_value);

        if triggered {
            self.dispatch_trigger(&alert, current_value).await?;
            alert.trigger_count += 1;
            alert.last_triggered_at = Some(self.clock.now());
        }

        // Step 5: update previous_value regardless of trigger outcome.
        alert.previous_value = Some(current_value);
        alert.current_value = Some(current_value);
        self.repos.alerts.upsert(alert).await?;
        Ok(())
    }

    async fn dispatch_trigger(&self, alert: &Alert, current_value: f64) -> crate::errors::EngineResult<()> {
        let title = format!("{:?} alert triggered", alert.alert_type);
        let body = alert.message.clone().unwrap_or_else(|| {
            format!(
                "{} {:?} {} (target {})",
                alert.symbol, alert.condition, current_value, alert.target_value
            )
        });

        let settings = queries::settings_or_default(self.repos.settings.as_ref(), alert.user_id).await;
        let user = self.repos.users.get(&alert.user_id).await?;

        self.notifier
            .notify(
                self.repos.notifications.as_ref(),
                alert.user_id,
                &user.email,
                &settings,
                &title,
                &body,
            )
            .await?;

        let payload = serde_json::json!({
            "alertId": alert.id,
            "type": alert.alert_type,
            "symbol": alert.symbol,
            "condition": alert.condition,
            "targetValue": alert.target_value,
            "currentValue": current_value,
            "triggeredAt": self.clock.now(),
        });
        self.hub.send_to_user(alert.user_id, payload).await;
        Ok(())
    }

    /// Step 2: dispatches on alert type to find the freshest value.
    async fn resolve_current_value(&self, alert: &Alert) -> crate::errors::EngineResult<Option<f64>> {
        match alert.alert_type {
            AlertType::StockPrice | AlertType::StockVolume => {
                let Some(stock) = self.find_stock_by_symbol(&alert.symbol).await? else {
                    return Ok(None);
                };
                let Some(price) = queries::latest_stock_price(self.repos.stock_prices.as_ref(), stock.id).await? else {
                    return Ok(None);
                };
                Ok(Some(if alert.alert_type == AlertType::StockPrice {
                    price.close.to_f64().unwrap_or_default()
                } else {
                    price.volume as f64
                }))
            }
            AlertType::OddsChange => {
                // `alert.symbol` carries the composite `matchId:market:outcome` key.
                let Some((match_id, market, outcome)) = parse_composite(&alert.symbol) else {
                    return Ok(None);
                };
                let rows = self.repos.odds.list().await?;
                let latest = rows
                    .into_iter()
                    .filter(|o| o.match_id.to_string() == match_id && o.market == market && o.outcome == outcome)
                    .max_by_key(|o| o.observed_at);
                Ok(latest.and_then(|o| o.price.to_f64()))
            }
            AlertType::ValueBet => {
                let Ok(match_id) = alert.symbol.parse() else {
                    return Ok(None);
                };
                let latest = queries::latest_value_bet(self.repos.value_bets.as_ref(), match_id).await?;
                Ok(latest.and_then(|v| v.value_percent.to_f64()))
            }
            AlertType::Technical => Ok(None),
            AlertType::News | AlertType::Dividend | AlertType::Earnings | AlertType::MatchStart => Ok(None),
        }
    }

    async fn find_stock_by_symbol(&self, symbol: &str) -> crate::errors::EngineResult<Option<crate::domain::Stock>> {
        let stocks = self.repos.stocks.list().await?;
        Ok(stocks.into_iter().find(|s| s.symbol == symbol))
    }
}

#[async_trait]
impl Worker for AlertEngine {
    fn name(&self) -> &'static str {
        "AlertChecker"
    }

    async fn run(&self, _cancel: &tokio_util::sync::CancellationToken) -> crate::errors::EngineResult<()> {
        self.tick().await;
        Ok(())
    }
}

fn parse_composite(key: &str) -> Option<(String, String, String)> {
    let mut parts = key.splitn(3, ':');
    let match_id = parts.next()?.to_string();
    let market = parts.next()?.to_string();
    let outcome = parts.next()?.to_string();
    Some((match_id, market, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::domain::{AlertCondition, AlertId, AlertType, Stock, StockPrice, StockPriceId, User, UserId};
    use crate::hub::RealtimeHub;
    use crate::notify::Notifier;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn silent_notifier() -> Arc<Notifier> {
        Arc::new(Notifier::from_config(&crate::config::AppConfig {
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
            intervals: crate::config::WorkerIntervals::default(),
            ensemble_weights: crate::risk::ensemble::EnsembleWeights::default(),
            liquid_leagues: vec!["epl".into()],
        }))
    }

    #[tokio::test]
    async fn a_price_crossing_above_target_triggers_and_bumps_trigger_count() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();
        let repos = Arc::new(Repos::in_memory());

        let user = User::new("trader@example.test", "hash".into());
        repos.users.create(user.clone()).await.unwrap();

        let stock = Stock::new("ACME", "Acme Corp".into(), "tech".into(), dec!(1_000_000));
        repos.stocks.create(stock.clone()).await.unwrap();
        repos
            .stock_prices
            .create(StockPrice {
                id: StockPriceId::new(),
                stock_id: stock.id,
                timestamp: now,
                open: dec!(100),
                high: dec!(101),
                low: dec!(99),
                close: dec!(101.0),
                volume: 1000,
            })
            .await
            .unwrap();

        let alert = Alert {
            id: AlertId::new(),
            user_id: user.id,
            alert_type: AlertType::StockPrice,
            symbol: "ACME".into(),
            condition: AlertCondition::Above,
            target_value: 100.0,
            current_value: None,
            previous_value: Some(95.0),
            last_triggered_at: None,
            trigger_count: 0,
            active: true,
            notify_email: false,
            notify_telegram: false,
            notify_line: false,
            notify_discord: false,
            message: None,
        };
        repos.alerts.create(alert.clone()).await.unwrap();

        let engine = AlertEngine::new(
            repos.clone(),
            silent_notifier(),
            RealtimeHub::spawn(),
            Arc::new(FixedClock::new(now)),
        );
        engine.tick().await;

        let stored = repos.alerts.get(&alert.id).await.unwrap();
        assert_eq!(stored.trigger_count, 1);
        assert_eq!(stored.last_triggered_at, Some(now));
        assert_eq!(stored.previous_value, Some(101.0));

        let notifications = repos.notifications.list().await.unwrap();
        assert_eq!(notifications.len(), 1);
    }

    #[tokio::test]
    async fn an_unresolvable_value_skips_without_bumping_trigger_count() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();
        let repos = Arc::new(Repos::in_memory());

        // No Stock row exists for "GHOST", so the value cannot be resolved.
        let alert = Alert {
            id: AlertId::new(),
            user_id: UserId::new(),
            alert_type: AlertType::StockPrice,
            symbol: "GHOST".into(),
            condition: AlertCondition::Above,
            target_value: 10.0,
            current_value: None,
            previous_value: None,
            last_triggered_at: None,
            trigger_count: 0,
            active: true,
            notify_email: false,
            notify_telegram: false,
            notify_line: false,
            notify_discord: false,
            message: None,
        };
        repos.alerts.create(alert.clone()).await.unwrap();

        let engine = AlertEngine::new(
            repos.clone(),
            silent_notifier(),
            RealtimeHub::spawn(),
            Arc::new(FixedClock::new(now)),
        );
        engine.tick().await;

        let stored = repos.alerts.get(&alert.id).await.unwrap();
        assert_eq!(stored.trigger_count, 0);
        assert!(stored.previous_value.is_none());
    }
}
