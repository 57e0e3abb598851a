//! `Entity` bindings for the twenty domain entities (spec §3) plus the
//! handful of secondary-index queries workers need (latest odds per match,
//! latest price per stock, active alerts, pending notifications) -- done by
//! listing and filtering rather than bespoke SQL, per the non-goal on SQL
//! schema detail (spec §1).

use crate::domain::*;
use crate::errors::EngineResult;
use crate::repo::Repository;

macro_rules! impl_entity {
    ($ty:ty, $kind:literal, $id_ty:ty, $id_field:ident) => {
        impl crate::repo::Entity for $ty {
            const KIND: &'static str = $kind;
            type Id = $id_ty;
            fn id(&self) -> $id_ty {
                self.$id_field
            }
        }
    };
}

impl_entity!(User, "user", UserId, id);
impl_entity!(Session, "session", SessionId, id);
impl_entity!(Team, "team", TeamId, id);
impl_entity!(Match, "match", MatchId, id);
impl_entity!(Odds, "odds", OddsId, id);
impl_entity!(Stock, "stock", StockId, id);
impl_entity!(StockPrice, "stock_price", StockPriceId, id);
impl_entity!(Portfolio, "portfolio", PortfolioId, id);
impl_entity!(Position, "position", PositionId, id);
impl_entity!(Order, "order", OrderId, id);
impl_entity!(Trade, "trade", TradeId, id);
impl_entity!(Bet, "bet", BetId, id);
impl_entity!(BankrollHistory, "bankroll_history", BankrollHistoryId, id);
impl_entity!(ValueBet, "value_bet", ValueBetId, id);
impl_entity!(StockNews, "stock_news", StockNewsId, id);
impl_entity!(Watchlist, "watchlist", WatchlistId, id);
impl_entity!(Alert, "alert", AlertId, id);
impl_entity!(Notification, "notification", NotificationId, id);
impl_entity!(FairValue, "fair_value", FairValueId, id);

impl crate::repo::Entity for Settings {
    const KIND: &'static str = "settings";
    type Id = UserId;
    fn id(&self) -> UserId {
        self.user_id
    }
}

impl crate::repo::Entity for WatchlistItem {
    const KIND: &'static str = "watchlist_item";
    type Id = String;
    fn id(&self) -> String {
        format!("{}:{}", self.watchlist_id, self.stock_id)
    }
}

/// Latest StockPrice row for `stock_id`, by `timestamp`.
pub async fn latest_stock_price<R: Repository<StockPrice>>(
    repo: &R,
    stock_id: StockId,
) -> EngineResult<Option<StockPrice>> {
    let rows = repo.list().await?;
    Ok(rows
        .into_iter()
        .filter(|p| p.stock_id == stock_id)
        .max_by_key(|p| p.timestamp))
}

/// Latest Odds row for `(match_id, bookmaker, market, outcome)`, by `observed_at`.
pub async fn latest_odds<R: Repository<Odds>>(
    repo: &R,
    match_id: MatchId,
    bookmaker: &str,
    market: &str,
    outcome: &str,
) -> EngineResult<Option<Odds>> {
    let rows = repo.list().await?;
    Ok(rows
        .into_iter()
        .filter(|o| {
            o.match_id == match_id && o.bookmaker == bookmaker && o.market == market && o.outcome == outcome
        })
        .max_by_key(|o| o.observed_at))
}

/// Latest ValueBet.valuePercent for a match, across all markets/selections.
pub async fn latest_value_bet<R: Repository<ValueBet>>(
    repo: &R,
    match_id: MatchId,
) -> EngineResult<Option<ValueBet>> {
    let rows = repo.list().await?;
    Ok(rows
        .into_iter()
        .filter(|v| v.match_id == match_id)
        .max_by_key(|v| v.created_at))
}

/// Settings rows are created lazily; callers fall back to account defaults
/// stamped with the right `user_id` rather than failing (spec §7).
pub async fn settings_or_default<R: Repository<Settings>>(
    repo: &R,
    user_id: crate::domain::UserId,
) -> Settings {
    match repo.get(&user_id).await {
        Ok(settings) => settings,
        Err(_) => Settings {
            user_id,
            ..Default::default()
        },
    }
}

pub async fn active_alerts<R: Repository<Alert>>(repo: &R) -> EngineResult<Vec<Alert>> {
    let rows = repo.list().await?;
    Ok(rows.into_iter().filter(|a| a.active).collect())
}

pub async fn pending_notifications<R: Repository<Notification>>(repo: &R) -> EngineResult<Vec<Notification>> {
    let rows = repo.list().await?;
    Ok(rows
        .into_iter()
        .filter(|n| n.status == NotificationStatus::Unread)
        .collect())
}
