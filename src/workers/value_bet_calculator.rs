//! `ValueBetCalculator` (spec §4.6, 1 h): for scheduled matches in the next 7
//! days, compute a true probability via the weighted ensemble, compare
//! against every available bookmaker odds row, and persist + notify on
//! `valuePercent >= 5%`.

use crate::context::AppContext;
use crate::domain::{MatchStatus, ValueBet};
use crate::errors::EngineResult;
use crate::repo::{entities as queries, Repository};
use crate::risk::ensemble::{self, EnsembleInput};
use crate::risk::kelly::kelly_stake;
use async_trait::async_trait;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const VALUE_THRESHOLD_PERCENT: rust_decimal::Decimal = dec!(5);
const HORIZON_DAYS: i64 = 7;

pub struct ValueBetCalculatorWorker {
    ctx: Arc<AppContext>,
}

impl ValueBetCalculatorWorker {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    async fn ensemble_input_for(&self, home_team_id: crate::domain::TeamId, away_team_id: crate::domain::TeamId) -> EngineResult<EnsembleInput> {
        let teams = self.ctx.repos.teams.list().await?;
        let home = teams.iter().find(|t| t.id == home_team_id);
        let away = teams.iter().find(|t| t.id == away_team_id);
        let home_elo = home.and_then(|t| t.elo_rating.to_f64()).unwrap_or(1500.0);
        let away_elo = away.and_then(|t| t.elo_rating.to_f64()).unwrap_or(1500.0);

        Ok(EnsembleInput {
            home_elo,
            away_elo,
            home_goals_avg: 1.4,
            away_goals_avg: 1.2,
            home_xg: 1.4,
            away_xg: 1.2,
            home_win_rate: 0.5 + (home_elo - away_elo) / 2000.0,
            prior_alpha: 5.0,
            prior_beta: 5.0,
        })
    }
}

#[async_trait]
impl crate::workers::Worker for ValueBetCalculatorWorker {
    fn name(&self) -> &'static str {
        "ValueBetCalculator"
    }

    async fn run(&self, _cancel: &CancellationToken) -> EngineResult<()> {
        let now = self.ctx.clock.now();
        let horizon = now + chrono::Duration::days(HORIZON_DAYS);

        let matches = self.ctx.repos.matches.list().await?;
        let upcoming: Vec<_> = matches
            .into_iter()
            .filter(|m| m.status == MatchStatus::Scheduled && m.start_time <= horizon)
            .collect();

        let users = self.ctx.repos.users.list().await?;
        let odds_rows = self.ctx.repos.odds.list().await?;

        for m in upcoming {
            let input = self.ensemble_input_for(m.home_team_id, m.away_team_id).await?;
            let true_prob_home = ensemble::combine(&input, &self.ctx.config.ensemble_weights);
            let true_prob_away = 1.0 - true_prob_home;

            let match_odds: Vec<_> = odds_rows.iter().filter(|o| o.match_id == m.id).collect();
            for odds in match_odds {
                let true_probability = match odds.outcome.as_str() {
                    "home" => true_prob_home,
                    "away" => true_prob_away,
                    _ => continue,
                };
                let Some(true_probability_decimal) = rust_decimal::Decimal::from_f64(true_probability) else {
                    continue;
                };

                let Ok(value_bet) = ValueBet::new(
                    m.id,
                    odds.market.clone(),
                    odds.outcome.clone(),
                    odds.bookmaker.clone(),
                    odds.price,
                    true_probability_decimal,
                    dec!(0.7),
                    m.start_time,
                ) else {
                    continue;
                };

                if value_bet.value_percent < VALUE_THRESHOLD_PERCENT {
                    continue;
                }

                let mut value_bet = value_bet;
                value_bet.kelly_stake = kelly_stake(odds.price, true_probability_decimal);
                let value_bet = self.ctx.repos.value_bets.create(value_bet).await?;

                for user in &users {
                    let user_settings = queries::settings_or_default(self.ctx.repos.settings.as_ref(), user.id).await;
                    if user_settings.value_bet_threshold <= value_bet.value_percent {
                        if let Err(e) = self
                            .ctx
                            .notifier
                            .notify(
                                self.ctx.repos.notifications.as_ref(),
                                user.id,
                                &user.email,
                                &user_settings,
                                "New value bet",
                                &format!(
                                    "{} {} @ {} ({}% edge)",
                                    odds.bookmaker, odds.outcome, odds.price, value_bet.value_percent
                                ),
                            )
                            .await
                        {
                            tracing::warn!(error = %e, "failed to notify user of value bet");
                        }
                    }
                }
            }
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
    use crate::context::{Providers, Repos};
    use crate::domain::{Settings, User};
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
    async fn a_big_elo_gap_against_generous_odds_produces_a_value_bet() {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap();
        let ctx = test_ctx(now);

        let home = crate::domain::Team {
            id: crate::domain::TeamId::new(),
            name: "Home FC".into(),
            country: "XX".into(),
            elo_rating: rust_decimal::Decimal::from(1900),
        };
        let away = crate::domain::Team {
            id: crate::domain::TeamId::new(),
            name: "Away FC".into(),
            country: "XX".into(),
            elo_rating: rust_decimal::Decimal::from(1500),
        };
        ctx.repos.teams.create(home.clone()).await.unwrap();
        ctx.repos.teams.create(away.clone()).await.unwrap();

        let m = crate::domain::Match {
            id: crate::domain::MatchId::new(),
            league: "epl".into(),
            home_team_id: home.id,
            away_team_id: away.id,
            start_time: now + chrono::Duration::hours(6),
            status: crate::domain::MatchStatus::Scheduled,
            venue: "neutral".into(),
            home_score: None,
            away_score: None,
        };
        ctx.repos.matches.create(m.clone()).await.unwrap();

        ctx.repos
            .odds
            .create(crate::domain::Odds {
                id: crate::domain::OddsId::new(),
                match_id: m.id,
                bookmaker: "pinnacle".into(),
                market: "moneyline".into(),
                outcome: "home".into(),
                price: rust_decimal::Decimal::from(3),
                observed_at: now,
            })
            .await
            .unwrap();

        let user = User::new("bettor@example.test", "hash".into());
        ctx.repos.users.create(user.clone()).await.unwrap();
        ctx.repos
            .settings
            .create(Settings {
                notify_email: false,
                ..Settings {
                    user_id: user.id,
                    ..Default::default()
                }
            })
            .await
            .unwrap();

        let worker = ValueBetCalculatorWorker::new(ctx.clone());
        worker.run(&CancellationToken::new()).await.unwrap();

        let stored = ctx.repos.value_bets.list().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].value_percent >= VALUE_THRESHOLD_PERCENT);
        assert!(stored[0].kelly_stake > rust_decimal::Decimal::ZERO);

        let notifications = ctx.repos.notifications.list().await.unwrap();
        assert_eq!(notifications.len(), 1);
    }

    #[tokio::test]
    async fn a_fair_price_produces_no_value_bet() {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap();
        let ctx = test_ctx(now);

        let home = crate::domain::Team {
            id: crate::domain::TeamId::new(),
            name: "Home FC".into(),
            country: "XX".into(),
            elo_rating: rust_decimal::Decimal::from(1500),
        };
        let away = crate::domain::Team {
            id: crate::domain::TeamId::new(),
            name: "Away FC".into(),
            country: "XX".into(),
            elo_rating: rust_decimal::Decimal::from(1500),
        };
        ctx.repos.teams.create(home.clone()).await.unwrap();
        ctx.repos.teams.create(away.clone()).await.unwrap();

        let m = crate::domain::Match {
            id: crate::domain::MatchId::new(),
            league: "epl".into(),
            home_team_id: home.id,
            away_team_id: away.id,
            start_time: now + chrono::Duration::hours(6),
            status: crate::domain::MatchStatus::Scheduled,
            venue: "neutral".into(),
            home_score: None,
            away_score: None,
        };
        ctx.repos.matches.create(m.clone()).await.unwrap();

        // A price already close to the ensemble's fair value for a balanced
        // matchup leaves no edge above the 5% threshold.
        ctx.repos
            .odds
            .create(crate::domain::Odds {
                id: crate::domain::OddsId::new(),
                match_id: m.id,
                bookmaker: "pinnacle".into(),
                market: "moneyline".into(),
                outcome: "home".into(),
                price: rust_decimal::Decimal::new(180, 2),
                observed_at: now,
            })
            .await
            .unwrap();

        let worker = ValueBetCalculatorWorker::new(ctx.clone());
        worker.run(&CancellationToken::new()).await.unwrap();

        let stored = ctx.repos.value_bets.list().await.unwrap();
        assert!(stored.is_empty());
    }
}
