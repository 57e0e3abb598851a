//! `NewsSync` (spec §4.6, 15 min): pulls from configured news sources,
//! dedupes by URL, persists with `sentiment = 0` pending `SentimentAnalysis`.

use crate::context::AppContext;
use crate::domain::{SentimentLabel, StockNews};
use crate::errors::EngineResult;
use crate::repo::Repository;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const NEWS_QUERIES: &[&str] = &["markets", "earnings"];

pub struct NewsSyncWorker {
    ctx: Arc<AppContext>,
}

impl NewsSyncWorker {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl crate::workers::Worker for NewsSyncWorker {
    fn name(&self) -> &'static str {
        "NewsSync"
    }

    async fn run(&self, cancel: &CancellationToken) -> EngineResult<()> {
        let existing = self.ctx.repos.stock_news.list().await?;
        let mut seen_urls: std::collections::HashSet<String> = existing.into_iter().map(|n| n.url).collect();

        for query in NEWS_QUERIES {
            let items = self.ctx.providers.news.get_news(query, cancel).await?;
            for item in items {
                if seen_urls.contains(&item.url) {
                    continue;
                }
                seen_urls.insert(item.url.clone());

                let news = StockNews {
                    id: crate::domain::StockNewsId::new(),
                    symbol: item.symbol,
                    title: item.title,
                    content: item.content,
                    url: item.url,
                    source: item.source,
                    published_at: item.published_at,
                    sentiment: 0.0,
                    sentiment_label: SentimentLabel::Neutral,
                    event_type: None,
                };
                self.ctx.repos.stock_news.create(news).await?;
            }
        }
        Ok(())
    }
}
