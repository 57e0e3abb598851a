//! Equity quote/history provider client (`GetQuote`/`GetOverview`/
//! `GetHistorical`, spec §4.1), modeled on an Alpha Vantage-shaped vendor API.

use super::ProviderBase;
use crate::errors::EngineResult;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteQuote {
    pub symbol: String,
    pub price: Decimal,
    pub change: Decimal,
    pub change_percent: Decimal,
    pub volume: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteOverview {
    pub symbol: String,
    pub name: String,
    pub sector: String,
    pub market_cap: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteBar {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
}

pub struct QuoteProviderClient {
    base: ProviderBase,
    base_url: String,
}

impl QuoteProviderClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let auth_header = api_key.map(|key| ("X-Api-Key", key));
        Self {
            base: ProviderBase::new(5, auth_header),
            base_url: base_url.into(),
        }
    }

    /// Batch quote fetch for the union of watched symbols (spec §4.6
    /// StockSync: "default list ∪ watchlist items").
    pub async fn get_quotes(&self, symbols: &[String], cancel: &CancellationToken) -> EngineResult<Vec<RemoteQuote>> {
        self.base.acquire(cancel).await?;
        let url = format!("{}/quotes?symbols={}", self.base_url, symbols.join(","));
        let response = self.base.request(reqwest::Method::GET, &url).send().await?;
        self.base.decode(response).await
    }

    pub async fn get_overview(&self, symbol: &str, cancel: &CancellationToken) -> EngineResult<RemoteOverview> {
        self.base.acquire(cancel).await?;
        let url = format!("{}/overview/{symbol}", self.base_url);
        let response = self.base.request(reqwest::Method::GET, &url).send().await?;
        self.base.decode(response).await
    }

    pub async fn get_historical(&self, symbol: &str, cancel: &CancellationToken) -> EngineResult<Vec<RemoteBar>> {
        self.base.acquire(cancel).await?;
        let url = format!("{}/historical/{symbol}", self.base_url);
        let response = self.base.request(reqwest::Method::GET, &url).send().await?;
        self.base.decode(response).await
    }
}
