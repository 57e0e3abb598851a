//! Sports-odds provider client (`GetSports`/`GetMatches`/`GetOdds`, spec §4.1),
//! modeled on Pinnacle/Betfair-shaped vendor APIs. Grounded on the teacher's
//! `kalshi::client::public_get`/`auth_get` split.

use super::ProviderBase;
use crate::domain::MatchStatus;
use crate::errors::EngineResult;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteMatch {
    pub external_id: String,
    pub league: String,
    pub home_team: String,
    pub away_team: String,
    pub start_time: DateTime<Utc>,
    pub status: MatchStatus,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteOdds {
    pub bookmaker: String,
    pub market: String,
    pub outcome: String,
    pub price: Decimal,
}

pub struct OddsProviderClient {
    base: ProviderBase,
    base_url: String,
}

impl OddsProviderClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let auth_header = api_key.map(|key| ("Authorization", format!("Bearer {key}")));
        Self {
            base: ProviderBase::new(5, auth_header),
            base_url: base_url.into(),
        }
    }

    pub async fn get_matches(&self, league: &str, cancel: &CancellationToken) -> EngineResult<Vec<RemoteMatch>> {
        self.base.acquire(cancel).await?;
        let url = format!("{}/leagues/{league}/matches", self.base_url);
        let response = self.base.request(reqwest::Method::GET, &url).send().await?;
        self.base.decode(response).await
    }

    pub async fn get_odds(&self, external_match_id: &str, cancel: &CancellationToken) -> EngineResult<Vec<RemoteOdds>> {
        self.base.acquire(cancel).await?;
        let url = format!("{}/matches/{external_match_id}/odds", self.base_url);
        let response = self.base.request(reqwest::Method::GET, &url).send().await?;
        self.base.decode(response).await
    }
}
