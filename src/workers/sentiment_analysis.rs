//! `SentimentAnalysis` (spec §4.6, 30 min): scores up to 100 unscored
//! StockNews rows via the pluggable `SentimentModel` (spec §9 OQ1).

use crate::context::AppContext;
use crate::domain::SentimentLabel;
use crate::errors::EngineResult;
use crate::repo::Repository;
use crate::risk::{KeywordSentimentModel, SentimentModel};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const BATCH_SIZE: usize = 100;

pub struct SentimentAnalysisWorker {
    ctx: Arc<AppContext>,
    model: Arc<dyn SentimentModel>,
}

impl SentimentAnalysisWorker {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self {
            ctx,
            model: Arc::new(KeywordSentimentModel),
        }
    }
}

#[async_trait]
impl crate::workers::Worker for SentimentAnalysisWorker {
    fn name(&self) -> &'static str {
        "SentimentAnalysis"
    }

    async fn run(&self, _cancel: &CancellationToken) -> EngineResult<()> {
        let news = self.ctx.repos.stock_news.list().await?;
        let unscored = news.into_iter().filter(|n| n.sentiment == 0.0).take(BATCH_SIZE);

        for mut item in unscored {
            let score = self.model.score(&format!("{} {}", item.title, item.content));
            item.sentiment = score;
            item.sentiment_label = SentimentLabel::from_score(score);
            self.ctx.repos.stock_news.upsert(item).await?;
        }
        Ok(())
    }
}
