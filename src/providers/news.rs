//! News provider client (`GetNews`, spec §4.1), modeled on a NewsAPI-shaped
//! vendor API.

use super::ProviderBase;
use crate::errors::EngineResult;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteNewsItem {
    pub symbol: Option<String>,
    pub title: String,
    pub content: String,
    pub url: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
}

pub struct NewsProviderClient {
    base: ProviderBase,
    base_url: String,
}

impl NewsProviderClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let auth_header = api_key.map(|key| ("X-Api-Key", key));
        Self {
            base: ProviderBase::new(2, auth_header),
            base_url: base_url.into(),
        }
    }

    pub async fn get_news(&self, query: &str, cancel: &CancellationToken) -> EngineResult<Vec<RemoteNewsItem>> {
        self.base.acquire(cancel).await?;
        let url = format!("{}/news?q={query}", self.base_url);
        let response = self.base.request(reqwest::Method::GET, &url).send().await?;
        self.base.decode(response).await
    }
}
