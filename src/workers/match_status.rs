//! `MatchStatus` (spec §4.6, 1 min): advances matches starting within the
//! next 2 hours toward their live/finished status. Bet settlement on
//! transition to `finished` is out of core scope (spec §4.6) and only logged
//! here as a hook point.

use crate::context::AppContext;
use crate::domain::MatchStatus;
use crate::errors::EngineResult;
use crate::repo::Repository;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct MatchStatusWorker {
    ctx: Arc<AppContext>,
}

impl MatchStatusWorker {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl crate::workers::Worker for MatchStatusWorker {
    fn name(&self) -> &'static str {
        "MatchStatus"
    }

    async fn run(&self, _cancel: &CancellationToken) -> EngineResult<()> {
        let now = self.ctx.clock.now();
        let horizon = now + chrono::Duration::hours(2);
        let matches = self.ctx.repos.matches.list().await?;

        for mut m in matches {
            if !matches!(m.status, MatchStatus::Scheduled | MatchStatus::Live | MatchStatus::Halftime) {
                continue;
            }
            if m.start_time > horizon {
                continue;
            }

            let previous_status = m.status;
            m.status = next_status(m.status, m.start_time, now);
            if m.status == previous_status {
                continue;
            }

            if !m.status.has_score() {
                m.home_score = None;
                m.away_score = None;
            } else if m.home_score.is_none() {
                m.home_score = Some(0);
                m.away_score = Some(0);
            }
            m.validate()?;

            if m.status == MatchStatus::Finished {
                tracing::info!(match_id = %m.id, "match finished, bet settlement deferred to the API layer");
            }

            self.ctx.repos.matches.upsert(m).await?;
        }
        Ok(())
    }
}

fn next_status(current: MatchStatus, start_time: chrono::DateTime<chrono::Utc>, now: chrono::DateTime<chrono::Utc>) -> MatchStatus {
    match current {
        MatchStatus::Scheduled if now >= start_time => MatchStatus::Live,
        MatchStatus::Live if now >= start_time + chrono::Duration::hours(2) => MatchStatus::Finished,
        other => other,
    }
}
