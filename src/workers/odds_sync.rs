//! `OddsSync` (spec §4.6, 5 min): for each configured league, fetch matches
//! and odds; cache the latest snapshot, append an Odds history row, and
//! broadcast to subscribers. Grounded on the teacher's `kalshi::scanner`
//! interval-fetch-and-select loop.

use crate::cache::{topics, ttl};
use crate::context::AppContext;
use crate::domain::{Match, MatchStatus, Odds, Team};
use crate::errors::EngineResult;
use crate::providers::odds::{RemoteMatch, RemoteOdds};
use crate::repo::Repository;
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const DEFAULT_LEAGUES: &[&str] = &["epl", "nba", "nfl"];

pub struct OddsSyncWorker {
    ctx: Arc<AppContext>,
}

impl OddsSyncWorker {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    async fn find_or_create_team(&self, name: &str) -> EngineResult<Team> {
        let teams = self.ctx.repos.teams.list().await?;
        if let Some(team) = teams.into_iter().find(|t| t.name == name) {
            return Ok(team);
        }
        let team = Team {
            id: crate::domain::TeamId::new(),
            name: name.to_string(),
            country: "unknown".into(),
            elo_rating: rust_decimal_macros::dec!(1500),
        };
        self.ctx.repos.teams.create(team).await
    }

    async fn find_or_create_match(&self, league: &str, remote: &RemoteMatch) -> EngineResult<Match> {
        let home = self.find_or_create_team(&remote.home_team).await?;
        let away = self.find_or_create_team(&remote.away_team).await?;

        let existing = self.ctx.repos.matches.list().await?;
        if let Some(m) = existing.into_iter().find(|m| {
            m.league == league && m.home_team_id == home.id && m.away_team_id == away.id && m.start_time == remote.start_time
        }) {
            return Ok(m);
        }

        let has_score = matches!(remote.status, MatchStatus::Live | MatchStatus::Halftime | MatchStatus::Finished);
        let new_match = Match {
            id: crate::domain::MatchId::new(),
            league: league.to_string(),
            home_team_id: home.id,
            away_team_id: away.id,
            start_time: remote.start_time,
            status: remote.status,
            venue: String::new(),
            home_score: if has_score { remote.home_score } else { None },
            away_score: if has_score { remote.away_score } else { None },
        };
        new_match.validate()?;
        self.ctx.repos.matches.create(new_match).await
    }

    async fn sync_league(&self, league: &str, cancel: &CancellationToken) -> EngineResult<()> {
        let remote_matches = self.ctx.providers.odds.get_matches(league, cancel).await?;
        for remote_match in remote_matches {
            let local_match = self.find_or_create_match(league, &remote_match).await?;
            let remote_odds = self.ctx.providers.odds.get_odds(&remote_match.external_id, cancel).await?;
            for quote in remote_odds {
                self.ingest_odds(local_match.id, &quote).await?;
            }
        }
        Ok(())
    }

    async fn ingest_odds(&self, match_id: crate::domain::MatchId, quote: &RemoteOdds) -> EngineResult<()> {
        let row = Odds {
            id: crate::domain::OddsId::new(),
            match_id,
            bookmaker: quote.bookmaker.clone(),
            market: quote.market.clone(),
            outcome: quote.outcome.clone(),
            price: quote.price,
            observed_at: self.ctx.clock.now(),
        };
        row.validate()?;

        let cache_key = format!("odds:{match_id}");
        self.ctx.cache.set_json(&cache_key, &row, Some(ttl::ODDS_SNAPSHOT))?;

        self.ctx.repos.odds.create(row.clone()).await?;

        self.ctx.hub.broadcast("odds", serde_json::json!({
            "matchId": match_id,
            "bookmaker": row.bookmaker,
            "market": row.market,
            "outcome": row.outcome,
            "price": row.price.to_f64(),
            "updatedAt": row.observed_at,
        })).await;
        self.ctx.cache.publish_json(topics::ODDS, &row)?;
        Ok(())
    }
}

#[async_trait]
impl crate::workers::Worker for OddsSyncWorker {
    fn name(&self) -> &'static str {
        "OddsSync"
    }

    async fn run(&self, cancel: &CancellationToken) -> EngineResult<()> {
        for league in DEFAULT_LEAGUES {
            if let Err(e) = self.sync_league(league, cancel).await {
                tracing::warn!(league, error = %e, "odds sync failed for league");
            }
        }
        Ok(())
    }
}
