use crate::domain::ids::*;
use crate::errors::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ── User / Session ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Case-folds the email, per spec §3's unique-case-folded invariant.
    pub fn new(email: &str, password_hash: String) -> Self {
        Self {
            id: UserId::new(),
            email: email.trim().to_lowercase(),
            password_hash,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Session {
    /// A session is valid iff `revoked_at is null AND expires_at > now()` (spec §3).
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

// ── Team / Match / Odds ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub country: String,
    pub elo_rating: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Scheduled,
    Live,
    Halftime,
    Finished,
    Postponed,
    Cancelled,
}

impl MatchStatus {
    pub fn has_score(self) -> bool {
        matches!(self, MatchStatus::Live | MatchStatus::Halftime | MatchStatus::Finished)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub league: String,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub start_time: DateTime<Utc>,
    pub status: MatchStatus,
    pub venue: String,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
}

impl Match {
    /// Enforces "scores present iff status in {live, halftime, finished}" (spec §3).
    pub fn validate(&self) -> EngineResult<()> {
        let has_scores = self.home_score.is_some() || self.away_score.is_some();
        if has_scores != self.status.has_score() {
            return Err(EngineError::Validation(format!(
                "match {}: score presence must match status {:?}",
                self.id, self.status
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Odds {
    pub id: OddsId,
    pub match_id: MatchId,
    pub bookmaker: String,
    pub market: String,
    pub outcome: String,
    pub price: Decimal,
    pub observed_at: DateTime<Utc>,
}

impl Odds {
    /// Price must be > 1.0 (spec §3, §8 boundary behavior).
    pub fn validate(&self) -> EngineResult<()> {
        if self.price <= Decimal::ONE {
            return Err(EngineError::Validation(format!(
                "odds price {} must be > 1.0",
                self.price
            )));
        }
        Ok(())
    }

    /// Composite cache/alert key `matchId:market:outcome` (spec §4.7 step 2).
    pub fn composite_key(match_id: MatchId, market: &str, outcome: &str) -> String {
        format!("{match_id}:{market}:{outcome}")
    }
}

// ── Stocks ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stock {
    pub id: StockId,
    pub symbol: String,
    pub name: String,
    pub sector: String,
    pub market_cap: Decimal,
}

impl Stock {
    pub fn new(symbol: &str, name: String, sector: String, market_cap: Decimal) -> Self {
        Self {
            id: StockId::new(),
            symbol: symbol.trim().to_uppercase(),
            name,
            sector,
            market_cap,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockPrice {
    pub id: StockPriceId,
    pub stock_id: StockId,
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
}

impl StockPrice {
    /// `low <= min(open,close) <= max(open,close) <= high` and `volume >= 0` (spec §3).
    pub fn validate(&self) -> EngineResult<()> {
        let lo = self.open.min(self.close);
        let hi = self.open.max(self.close);
        if !(self.low <= lo && lo <= hi && hi <= self.high) {
            return Err(EngineError::Validation(format!(
                "stock price ohlc out of order: low={} open={} close={} high={}",
                self.low, self.open, self.close, self.high
            )));
        }
        if self.volume < 0 {
            return Err(EngineError::Validation("volume must be >= 0".into()));
        }
        Ok(())
    }
}

// ── Portfolio / Position / Order / Trade ────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub id: PortfolioId,
    pub user_id: UserId,
    pub name: String,
    pub cash_balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub portfolio_id: PortfolioId,
    pub symbol: String,
    pub quantity: Decimal,
    pub avg_cost: Decimal,
    pub current_price: Decimal,
}

impl Position {
    /// `quantity == 0` marks the row eligible for deletion (spec §3); callers
    /// (the position repository's upsert) act on this rather than deleting eagerly.
    pub fn is_closed(&self) -> bool {
        self.quantity.is_zero()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Market,
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Filled,
    Cancelled,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub portfolio_id: PortfolioId,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Decimal,
    pub status: OrderStatus,
    pub filled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// `status = filled => filled_at is not null` (spec §3).
    pub fn validate(&self) -> EngineResult<()> {
        if self.quantity <= Decimal::ZERO {
            return Err(EngineError::Validation("order quantity must be > 0".into()));
        }
        if self.status == OrderStatus::Filled && self.filled_at.is_none() {
            return Err(EngineError::Validation(
                "filled order must have filled_at set".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub portfolio_id: PortfolioId,
    pub order_id: OrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub price: Decimal,
    pub total: Decimal,
    pub executed_at: DateTime<Utc>,
}

impl Trade {
    pub fn new(
        portfolio_id: PortfolioId,
        order_id: OrderId,
        symbol: String,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            id: TradeId::new(),
            portfolio_id,
            order_id,
            symbol,
            side,
            quantity,
            price,
            total: quantity * price,
            executed_at: Utc::now(),
        }
    }
}

// ── Bet / BankrollHistory / ValueBet ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetStatus {
    Pending,
    Settled,
    Void,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetResult {
    Won,
    Lost,
    Push,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bet {
    pub id: BetId,
    pub user_id: UserId,
    pub match_id: MatchId,
    pub market: String,
    pub bookmaker: String,
    pub odds: Decimal,
    pub stake: Decimal,
    pub status: BetStatus,
    pub result: Option<BetResult>,
    pub profit: Option<Decimal>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl Bet {
    /// `status = settled <=> result, profit, settled_at are all set` (spec §3, §8).
    pub fn validate(&self) -> EngineResult<()> {
        if self.odds <= Decimal::ONE {
            return Err(EngineError::Validation("bet odds must be > 1".into()));
        }
        if self.stake <= Decimal::ZERO {
            return Err(EngineError::Validation("bet stake must be > 0".into()));
        }
        let settled_fields_present =
            self.result.is_some() && self.profit.is_some() && self.settled_at.is_some();
        if (self.status == BetStatus::Settled) != settled_fields_present {
            return Err(EngineError::Validation(
                "settled status must coincide with result/profit/settled_at".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankrollHistory {
    pub id: BankrollHistoryId,
    pub user_id: UserId,
    pub balance: Decimal,
    pub change: Decimal,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueBet {
    pub id: ValueBetId,
    pub match_id: MatchId,
    pub market: String,
    pub selection: String,
    pub bookmaker: String,
    pub bookmaker_odds: Decimal,
    pub true_probability: Decimal,
    pub implied_probability: Decimal,
    pub value_percent: Decimal,
    pub kelly_stake: Decimal,
    pub confidence: Decimal,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ValueBet {
    /// `implied_probability = 1/bookmaker_odds` and the value-percent formula
    /// (spec §3, §8 property checks).
    pub fn new(
        match_id: MatchId,
        market: String,
        selection: String,
        bookmaker: String,
        bookmaker_odds: Decimal,
        true_probability: Decimal,
        confidence: Decimal,
        expires_at: DateTime<Utc>,
    ) -> EngineResult<Self> {
        if bookmaker_odds <= Decimal::ONE {
            return Err(EngineError::Validation("bookmaker odds must be > 1".into()));
        }
        if true_probability <= Decimal::ZERO || true_probability >= Decimal::ONE {
            return Err(EngineError::Validation(
                "true probability must be in (0,1)".into(),
            ));
        }
        let implied_probability = Decimal::ONE / bookmaker_odds;
        let value_percent =
            (true_probability - implied_probability) / implied_probability * Decimal::ONE_HUNDRED;
        Ok(Self {
            id: ValueBetId::new(),
            match_id,
            market,
            selection,
            bookmaker,
            bookmaker_odds,
            true_probability,
            implied_probability,
            value_percent,
            kelly_stake: Decimal::ZERO,
            confidence,
            expires_at,
            created_at: Utc::now(),
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

// ── StockNews / Watchlist ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn from_score(score: f64) -> Self {
        if score > 0.1 {
            SentimentLabel::Positive
        } else if score < -0.1 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockNews {
    pub id: StockNewsId,
    pub symbol: Option<String>,
    pub title: String,
    pub content: String,
    pub url: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub sentiment: f64,
    pub sentiment_label: SentimentLabel,
    pub event_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Watchlist {
    pub id: WatchlistId,
    pub user_id: UserId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistItem {
    pub watchlist_id: WatchlistId,
    pub stock_id: StockId,
    pub added_at: DateTime<Utc>,
    pub notes: Option<String>,
}

// ── Alert / Notification / Settings / FairValue ─────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    StockPrice,
    StockVolume,
    OddsChange,
    ValueBet,
    Technical,
    News,
    Dividend,
    Earnings,
    MatchStart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCondition {
    Above,
    Below,
    Equals,
    PercentUp,
    PercentDown,
    Crosses,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub user_id: UserId,
    pub alert_type: AlertType,
    pub symbol: String,
    pub condition: AlertCondition,
    pub target_value: f64,
    pub current_value: Option<f64>,
    pub previous_value: Option<f64>,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub trigger_count: u64,
    pub active: bool,
    pub notify_email: bool,
    pub notify_telegram: bool,
    pub notify_line: bool,
    pub notify_discord: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Unread,
    Read,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub title: String,
    pub body: String,
    pub status: NotificationStatus,
    pub channel: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(user_id: UserId, title: String, body: String, channel: &str) -> Self {
        Self {
            id: NotificationId::new(),
            user_id,
            title,
            body,
            status: NotificationStatus::Unread,
            channel: channel.to_string(),
            read_at: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub user_id: UserId,
    pub currency: String,
    pub language: String,
    pub theme: String,
    pub initial_bankroll: Decimal,
    pub risk_per_trade: Decimal,
    pub max_open_positions: i32,
    pub notify_email: bool,
    pub notify_telegram: bool,
    pub notify_line: bool,
    pub notify_discord: bool,
    pub value_bet_threshold: Decimal,
    pub telegram_chat_id: Option<String>,
    pub line_token: Option<String>,
    pub discord_webhook: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_id: UserId::new(),
            currency: "USD".into(),
            language: "en".into(),
            theme: "dark".into(),
            initial_bankroll: Decimal::new(1000, 0),
            risk_per_trade: Decimal::new(2, 2),
            max_open_positions: 10,
            notify_email: true,
            notify_telegram: false,
            notify_line: false,
            notify_discord: false,
            value_bet_threshold: Decimal::new(5, 0),
            telegram_chat_id: None,
            line_token: None,
            discord_webhook: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FairValueMethod {
    Dcf,
    Graham,
    Pe,
    Pb,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FairValue {
    pub id: FairValueId,
    pub symbol: String,
    pub method: FairValueMethod,
    pub value: Decimal,
    pub current_price: Decimal,
    pub upside_percent: Decimal,
    pub rating: String,
    pub calculated_at: DateTime<Utc>,
}
