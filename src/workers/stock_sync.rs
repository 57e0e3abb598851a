//! `StockSync` (spec §4.6, 1 min): batch-fetch quotes for the union of a
//! default watch list and every user's watchlist items; cache and broadcast.

use crate::cache::{topics, ttl};
use crate::context::AppContext;
use crate::domain::{Stock, StockPrice};
use crate::errors::EngineResult;
use crate::repo::Repository;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const DEFAULT_SYMBOLS: &[&str] = &["AAPL", "MSFT", "GOOGL"];

pub struct StockSyncWorker {
    ctx: Arc<AppContext>,
}

impl StockSyncWorker {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    async fn watched_symbols(&self) -> EngineResult<Vec<String>> {
        let mut symbols: HashSet<String> = DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect();
        let stocks = self.ctx.repos.stocks.list().await?;
        let watchlist_items = self.ctx.repos.watchlist_items.list().await?;
        for item in watchlist_items {
            if let Some(stock) = stocks.iter().find(|s| s.id == item.stock_id) {
                symbols.insert(stock.symbol.clone());
            }
        }
        Ok(symbols.into_iter().collect())
    }

    async fn find_or_create_stock(&self, symbol: &str) -> EngineResult<Stock> {
        let stocks = self.ctx.repos.stocks.list().await?;
        if let Some(stock) = stocks.into_iter().find(|s| s.symbol == symbol) {
            return Ok(stock);
        }
        let stock = Stock::new(symbol, symbol.to_string(), "unknown".into(), Decimal::ZERO);
        self.ctx.repos.stocks.create(stock).await
    }
}

#[async_trait]
impl crate::workers::Worker for StockSyncWorker {
    fn name(&self) -> &'static str {
        "StockSync"
    }

    async fn run(&self, cancel: &CancellationToken) -> EngineResult<()> {
        let symbols = self.watched_symbols().await?;
        let quotes = self.ctx.providers.quotes.get_quotes(&symbols, cancel).await?;

        for quote in quotes {
            let stock = self.find_or_create_stock(&quote.symbol).await?;

            let cache_key = format!("quote:{}", quote.symbol);
            self.ctx.cache.set_json(&cache_key, &quote, Some(ttl::QUOTE))?;

            let price = StockPrice {
                id: crate::domain::StockPriceId::new(),
                stock_id: stock.id,
                timestamp: quote.timestamp,
                open: quote.price - quote.change,
                high: quote.price.max(quote.price - quote.change),
                low: quote.price.min(quote.price - quote.change),
                close: quote.price,
                volume: quote.volume,
            };
            if let Err(e) = price.validate() {
                tracing::warn!(symbol = %quote.symbol, error = %e, "skipping invalid stock price");
                continue;
            }
            self.ctx.repos.stock_prices.create(price).await?;

            self.ctx.hub.broadcast("stocks", serde_json::json!({
                "symbol": quote.symbol,
                "price": quote.price,
                "change": quote.change,
                "changePercent": quote.change_percent,
                "volume": quote.volume,
                "updatedAt": quote.timestamp.timestamp(),
            })).await;
            self.ctx.cache.publish_json(topics::STOCKS, &quote)?;
        }
        Ok(())
    }
}
