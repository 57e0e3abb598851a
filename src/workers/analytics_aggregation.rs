//! `AnalyticsAggregation` (spec §4.6, 1 h): recompute per-user cached
//! aggregates (win rate, ROI by league/market/bookmaker, Sharpe, max
//! drawdown). Results live in the cache only, never persisted.

use crate::context::AppContext;
use crate::domain::{BetResult, BetStatus, UserId};
use crate::errors::EngineResult;
use crate::repo::Repository;
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Serialize, Default)]
struct BreakdownStats {
    settled: u32,
    wins: u32,
    staked: f64,
    profit: f64,
}

impl BreakdownStats {
    fn win_rate(&self) -> f64 {
        if self.settled == 0 {
            0.0
        } else {
            self.wins as f64 / self.settled as f64
        }
    }

    fn roi(&self) -> f64 {
        if self.staked == 0.0 {
            0.0
        } else {
            self.profit / self.staked
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct UserAnalytics {
    win_rate: f64,
    roi: f64,
    sharpe_ratio: f64,
    max_drawdown: f64,
    by_league: HashMap<String, BreakdownStatsView>,
    by_market: HashMap<String, BreakdownStatsView>,
    by_bookmaker: HashMap<String, BreakdownStatsView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct BreakdownStatsView {
    win_rate: f64,
    roi: f64,
}

impl From<&BreakdownStats> for BreakdownStatsView {
    fn from(s: &BreakdownStats) -> Self {
        Self {
            win_rate: s.win_rate(),
            roi: s.roi(),
        }
    }
}

pub struct AnalyticsAggregationWorker {
    ctx: Arc<AppContext>,
}

impl AnalyticsAggregationWorker {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }
}

/// Sample Sharpe ratio over a return series: mean / stddev, 0 when fewer
/// than two points or stddev is 0.
fn sharpe_ratio(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (returns.len() - 1) as f64;
    let stddev = variance.sqrt();
    if stddev == 0.0 {
        0.0
    } else {
        mean / stddev
    }
}

/// Largest peak-to-trough decline in a balance series, as a positive fraction.
fn max_drawdown(balances: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst: f64 = 0.0;
    for &balance in balances {
        peak = peak.max(balance);
        if peak > 0.0 {
            let drawdown = (peak - balance) / peak;
            worst = worst.max(drawdown);
        }
    }
    worst
}

#[async_trait]
impl crate::workers::Worker for AnalyticsAggregationWorker {
    fn name(&self) -> &'static str {
        "AnalyticsAggregation"
    }

    async fn run(&self, _cancel: &CancellationToken) -> EngineResult<()> {
        let users = self.ctx.repos.users.list().await?;
        let bets = self.ctx.repos.bets.list().await?;
        let matches = self.ctx.repos.matches.list().await?;
        let history = self.ctx.repos.bankroll_history.list().await?;

        let league_by_match: HashMap<_, _> = matches.iter().map(|m| (m.id, m.league.clone())).collect();

        for user in users {
            let user_bets: Vec<_> = bets.iter().filter(|b| b.user_id == user.id).collect();

            let mut overall = BreakdownStats::default();
            let mut by_league: HashMap<String, BreakdownStats> = HashMap::new();
            let mut by_market: HashMap<String, BreakdownStats> = HashMap::new();
            let mut by_bookmaker: HashMap<String, BreakdownStats> = HashMap::new();

            for bet in &user_bets {
                if bet.status != BetStatus::Settled {
                    continue;
                }
                let stake = bet.stake.to_f64().unwrap_or(0.0);
                let profit = bet.profit.and_then(|p| p.to_f64()).unwrap_or(0.0);
                let won = bet.result == Some(BetResult::Won);

                for stats in [&mut overall] {
                    stats.settled += 1;
                    stats.staked += stake;
                    stats.profit += profit;
                    if won {
                        stats.wins += 1;
                    }
                }

                let mut apply = |bucket: &mut HashMap<String, BreakdownStats>, key: String| {
                    let entry = bucket.entry(key).or_default();
                    entry.settled += 1;
                    entry.staked += stake;
                    entry.profit += profit;
                    if won {
                        entry.wins += 1;
                    }
                };
                if let Some(league) = league_by_match.get(&bet.match_id) {
                    apply(&mut by_league, league.clone());
                }
                apply(&mut by_market, bet.market.clone());
                apply(&mut by_bookmaker, bet.bookmaker.clone());
            }

            let user_history: Vec<f64> = {
                let mut rows: Vec<_> = history.iter().filter(|h| h.user_id == user.id).collect();
                rows.sort_by_key(|h| h.created_at);
                rows.iter().filter_map(|h| h.balance.to_f64()).collect()
            };
            let returns: Vec<f64> = user_history.windows(2).map(|w| (w[1] - w[0]) / w[0].max(1e-9)).collect();

            let analytics = UserAnalytics {
                win_rate: overall.win_rate(),
                roi: overall.roi(),
                sharpe_ratio: sharpe_ratio(&returns),
                max_drawdown: max_drawdown(&user_history),
                by_league: by_league.iter().map(|(k, v)| (k.clone(), v.into())).collect(),
                by_market: by_market.iter().map(|(k, v)| (k.clone(), v.into())).collect(),
                by_bookmaker: by_bookmaker.iter().map(|(k, v)| (k.clone(), v.into())).collect(),
            };

            self.ctx.cache.set_json(&cache_key(user.id), &analytics, None)?;
        }
        Ok(())
    }
}

fn cache_key(user_id: UserId) -> String {
    format!("analytics:{user_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::Worker;
    use crate::clock::FixedClock;
    use crate::config::WorkerIntervals;
    use crate::context::{AppContext, Providers, Repos};
    use crate::domain::{BankrollHistory, BankrollHistoryId, Bet, BetId, BetStatus, MatchId, User};
    use crate::hub::RealtimeHub;
    use crate::notify::Notifier;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    #[test]
    fn sharpe_ratio_is_zero_with_fewer_than_two_points() {
        assert_eq!(sharpe_ratio(&[0.05]), 0.0);
    }

    #[test]
    fn sharpe_ratio_rewards_consistent_positive_returns() {
        let steady = sharpe_ratio(&[0.02, 0.02, 0.02]);
        let volatile = sharpe_ratio(&[0.1, -0.08, 0.12, -0.09]);
        assert!(steady > volatile, "steady={steady} volatile={volatile}");
    }

    #[test]
    fn max_drawdown_finds_the_deepest_peak_to_trough_decline() {
        let balances = vec![100.0, 120.0, 90.0, 110.0, 60.0];
        let dd = max_drawdown(&balances);
        assert!((dd - 0.5).abs() < 1e-9, "expected 50% drawdown from 120 to 60, got {dd}");
    }

    fn test_ctx(now: chrono::DateTime<Utc>) -> Arc<AppContext> {
        let config = Arc::new(crate::config::AppConfig {
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
            cache: Arc::new(crate::cache::CacheService::new()),
            hub: RealtimeHub::spawn(),
            clock: Arc::new(FixedClock::new(now)),
            repos: Arc::new(Repos::in_memory()),
            config,
        })
    }

    #[tokio::test]
    async fn caches_win_rate_and_roi_from_settled_bets_only() {
        let now = Utc.with_ymd_and_hms(2026, 4, 1, 1, 0, 0).unwrap();
        let ctx = test_ctx(now);

        let user = User::new("trader@example.test", "hash".into());
        ctx.repos.users.create(user.clone()).await.unwrap();

        let won_bet = Bet {
            id: BetId::new(),
            user_id: user.id,
            match_id: MatchId::new(),
            market: "moneyline".into(),
            bookmaker: "pinnacle".into(),
            odds: dec!(2.0),
            stake: dec!(10.0),
            status: BetStatus::Settled,
            result: Some(crate::domain::BetResult::Won),
            profit: Some(dec!(10.0)),
            settled_at: Some(now),
        };
        let pending_bet = Bet {
            id: BetId::new(),
            user_id: user.id,
            match_id: MatchId::new(),
            market: "moneyline".into(),
            bookmaker: "pinnacle".into(),
            odds: dec!(1.9),
            stake: dec!(5.0),
            status: BetStatus::Pending,
            result: None,
            profit: None,
            settled_at: None,
        };
        ctx.repos.bets.create(won_bet).await.unwrap();
        ctx.repos.bets.create(pending_bet).await.unwrap();

        ctx.repos
            .bankroll_history
            .create(BankrollHistory {
                id: BankrollHistoryId::new(),
                user_id: user.id,
                balance: dec!(1000.0),
                change: dec!(0.0),
                reason: "initial".into(),
                created_at: now - chrono::Duration::days(1),
            })
            .await
            .unwrap();
        ctx.repos
            .bankroll_history
            .create(BankrollHistory {
                id: BankrollHistoryId::new(),
                user_id: user.id,
                balance: dec!(1010.0),
                change: dec!(10.0),
                reason: "settled bet".into(),
                created_at: now,
            })
            .await
            .unwrap();

        let worker = AnalyticsAggregationWorker::new(ctx.clone());
        worker.run(&CancellationToken::new()).await.unwrap();

        let cached: UserAnalytics = ctx.cache.get_json(&cache_key(user.id)).unwrap().expect("analytics cached");
        assert_eq!(cached.win_rate, 1.0);
        assert_eq!(cached.roi, 1.0);
    }
}
