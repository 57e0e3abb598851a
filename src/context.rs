//! Dependency bundle constructed once at startup and passed explicitly to
//! every worker and the alert engine (spec §9: "constructed once at startup
//! and passed explicitly to consumers (builder/DI), not read from
//! module-level singletons"). Grounded on the teacher's `AppState`, minus its
//! channel-based mutable counters (nothing here is mutated by reference).

use crate::alerts::AlertEngine;
use crate::cache::SharedCache;
use crate::clock::SharedClock;
use crate::config::AppConfig;
use crate::domain::*;
use crate::hub::RealtimeHub;
use crate::notify::Notifier;
use crate::providers::news::NewsProviderClient;
use crate::providers::odds::OddsProviderClient;
use crate::providers::quotes::QuoteProviderClient;
use crate::repo::sqlite::EntityStore;
use crate::repo::Backend;
use std::sync::Arc;

/// One `Backend<T>` per entity kind (spec §4.5: "two implementations behind
/// each interface").
pub struct Repos {
    /// `Some` only when built via [`Repos::sqlite`]; backs `run_maintenance`.
    maintenance_store: Option<EntityStore>,
    pub users: Arc<Backend<User>>,
    pub sessions: Arc<Backend<Session>>,
    pub teams: Arc<Backend<Team>>,
    pub matches: Arc<Backend<Match>>,
    pub odds: Arc<Backend<Odds>>,
    pub stocks: Arc<Backend<Stock>>,
    pub stock_prices: Arc<Backend<StockPrice>>,
    pub portfolios: Arc<Backend<Portfolio>>,
    pub positions: Arc<Backend<Position>>,
    pub orders: Arc<Backend<Order>>,
    pub trades: Arc<Backend<Trade>>,
    pub bets: Arc<Backend<Bet>>,
    pub bankroll_history: Arc<Backend<BankrollHistory>>,
    pub value_bets: Arc<Backend<ValueBet>>,
    pub stock_news: Arc<Backend<StockNews>>,
    pub watchlists: Arc<Backend<Watchlist>>,
    pub watchlist_items: Arc<Backend<WatchlistItem>>,
    pub alerts: Arc<Backend<Alert>>,
    pub notifications: Arc<Backend<Notification>>,
    pub settings: Arc<Backend<Settings>>,
    pub fair_values: Arc<Backend<FairValue>>,
}

impl Repos {
    /// Builds every repository on the in-memory backend (`USE_MOCK_DATA=true`
    /// and tests).
    pub fn in_memory() -> Self {
        Self {
            maintenance_store: None,
            users: Arc::new(Backend::memory()),
            sessions: Arc::new(Backend::memory()),
            teams: Arc::new(Backend::memory()),
            matches: Arc::new(Backend::memory()),
            odds: Arc::new(Backend::memory()),
            stocks: Arc::new(Backend::memory()),
            stock_prices: Arc::new(Backend::memory()),
            portfolios: Arc::new(Backend::memory()),
            positions: Arc::new(Backend::memory()),
            orders: Arc::new(Backend::memory()),
            trades: Arc::new(Backend::memory()),
            bets: Arc::new(Backend::memory()),
            bankroll_history: Arc::new(Backend::memory()),
            value_bets: Arc::new(Backend::memory()),
            stock_news: Arc::new(Backend::memory()),
            watchlists: Arc::new(Backend::memory()),
            watchlist_items: Arc::new(Backend::memory()),
            alerts: Arc::new(Backend::memory()),
            notifications: Arc::new(Backend::memory()),
            settings: Arc::new(Backend::memory()),
            fair_values: Arc::new(Backend::memory()),
        }
    }

    /// Builds every repository on the one shared `EntityStore` (persistent
    /// backend; production default).
    pub fn sqlite(store: EntityStore) -> Self {
        Self {
            maintenance_store: Some(store.clone()),
            users: Arc::new(Backend::sqlite(store.clone())),
            sessions: Arc::new(Backend::sqlite(store.clone())),
            teams: Arc::new(Backend::sqlite(store.clone())),
            matches: Arc::new(Backend::sqlite(store.clone())),
            odds: Arc::new(Backend::sqlite(store.clone())),
            stocks: Arc::new(Backend::sqlite(store.clone())),
            stock_prices: Arc::new(Backend::sqlite(store.clone())),
            portfolios: Arc::new(Backend::sqlite(store.clone())),
            positions: Arc::new(Backend::sqlite(store.clone())),
            orders: Arc::new(Backend::sqlite(store.clone())),
            trades: Arc::new(Backend::sqlite(store.clone())),
            bets: Arc::new(Backend::sqlite(store.clone())),
            bankroll_history: Arc::new(Backend::sqlite(store.clone())),
            value_bets: Arc::new(Backend::sqlite(store.clone())),
            stock_news: Arc::new(Backend::sqlite(store.clone())),
            watchlists: Arc::new(Backend::sqlite(store.clone())),
            watchlist_items: Arc::new(Backend::sqlite(store.clone())),
            alerts: Arc::new(Backend::sqlite(store.clone())),
            notifications: Arc::new(Backend::sqlite(store.clone())),
            settings: Arc::new(Backend::sqlite(store.clone())),
            fair_values: Arc::new(Backend::sqlite(store)),
        }
    }

    /// No-op on the in-memory backend; there is no connection to optimize.
    pub async fn run_maintenance(&self) -> crate::errors::EngineResult<()> {
        match &self.maintenance_store {
            Some(store) => store.run_maintenance().await,
            None => Ok(()),
        }
    }

    /// Empty on the in-memory backend; `Backup` becomes a no-op in that mode.
    pub async fn dump_all(&self) -> crate::errors::EngineResult<Vec<(String, String, String, String)>> {
        match &self.maintenance_store {
            Some(store) => store.dump_all().await,
            None => Ok(Vec::new()),
        }
    }
}

pub struct Providers {
    pub odds: OddsProviderClient,
    pub quotes: QuoteProviderClient,
    pub news: NewsProviderClient,
}

impl Providers {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            odds: OddsProviderClient::new("https://api.pinnacle.example.com", config.pinnacle_api_key.clone()),
            quotes: QuoteProviderClient::new("https://www.alphavantage.example.com", config.alphavantage_api_key.clone()),
            news: NewsProviderClient::new("https://newsapi.example.com/v2", config.newsapi_key.clone()),
        }
    }
}

/// Everything a worker or the alert engine needs, bundled once.
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub cache: SharedCache,
    pub hub: RealtimeHub,
    pub notifier: Arc<Notifier>,
    pub clock: SharedClock,
    pub repos: Arc<Repos>,
    pub providers: Arc<Providers>,
}

impl AppContext {
    pub fn alert_engine(&self) -> AlertEngine {
        AlertEngine::new(self.repos.clone(), self.notifier.clone(), self.hub.clone(), self.clock.clone())
    }
}
