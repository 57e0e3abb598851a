//! Environment configuration (spec §6). Every variable the core consumes is read
//! here, exactly once, at startup -- following the teacher's `env_var`/`env_var_or`
//! pattern rather than a config-file parser.

use crate::errors::{EngineError, EngineResult};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub port: u16,
    pub use_mock_data: bool,
    pub log_level: String,

    pub database_url: String,
    pub redis_url: Option<String>,

    pub pinnacle_api_key: Option<String>,
    pub betfair_app_key: Option<String>,
    pub betfair_session_token: Option<String>,
    pub alphavantage_api_key: Option<String>,
    pub newsapi_key: Option<String>,

    pub sendgrid_api_key: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub line_channel_token: Option<String>,
    pub discord_webhook_url: Option<String>,

    pub backup_path: std::path::PathBuf,
    pub backup_retention_days: i64,

    pub intervals: WorkerIntervals,
    pub ensemble_weights: crate::risk::ensemble::EnsembleWeights,
    /// Leagues `DailyPicks` treats as liquid enough to pick from (spec §9 OQ).
    pub liquid_leagues: Vec<String>,
}

/// Per-worker cadence overrides (`*_INTERVAL` env vars, spec §6).
#[derive(Debug, Clone)]
pub struct WorkerIntervals {
    pub odds_sync: Duration,
    pub stock_sync: Duration,
    pub match_status: Duration,
    pub news_sync: Duration,
    pub sentiment_analysis: Duration,
    pub value_bet_calculator: Duration,
    pub analytics_aggregation: Duration,
    pub alert_checker: Duration,
}

impl Default for WorkerIntervals {
    fn default() -> Self {
        Self {
            odds_sync: Duration::from_secs(5 * 60),
            stock_sync: Duration::from_secs(60),
            match_status: Duration::from_secs(60),
            news_sync: Duration::from_secs(15 * 60),
            sentiment_analysis: Duration::from_secs(30 * 60),
            value_bet_calculator: Duration::from_secs(60 * 60),
            analytics_aggregation: Duration::from_secs(60 * 60),
            alert_checker: Duration::from_secs(30),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();

        let use_mock_data = env_var_or("USE_MOCK_DATA", "false")
            .parse::<bool>()
            .unwrap_or(false);

        let port = env_var_or("PORT", "8080")
            .parse::<u16>()
            .map_err(|e| EngineError::Config(format!("PORT: {e}")))?;

        let backup_retention_days = env_var_or("BACKUP_RETENTION_DAYS", "7")
            .parse::<i64>()
            .map_err(|e| EngineError::Config(format!("BACKUP_RETENTION_DAYS: {e}")))?;

        let mut intervals = WorkerIntervals::default();
        if let Some(v) = env_duration_secs("ODDS_SYNC_INTERVAL")? {
            intervals.odds_sync = v;
        }
        if let Some(v) = env_duration_secs("STOCK_SYNC_INTERVAL")? {
            intervals.stock_sync = v;
        }
        if let Some(v) = env_duration_secs("MATCH_STATUS_INTERVAL")? {
            intervals.match_status = v;
        }
        if let Some(v) = env_duration_secs("NEWS_SYNC_INTERVAL")? {
            intervals.news_sync = v;
        }
        if let Some(v) = env_duration_secs("SENTIMENT_ANALYSIS_INTERVAL")? {
            intervals.sentiment_analysis = v;
        }
        if let Some(v) = env_duration_secs("VALUE_BET_CALCULATOR_INTERVAL")? {
            intervals.value_bet_calculator = v;
        }
        if let Some(v) = env_duration_secs("ANALYTICS_AGGREGATION_INTERVAL")? {
            intervals.analytics_aggregation = v;
        }
        if let Some(v) = env_duration_secs("ALERT_CHECKER_INTERVAL")? {
            intervals.alert_checker = v;
        }

        Ok(Self {
            env: env_var_or("ENV", "development"),
            port,
            use_mock_data,
            log_level: env_var_or("LOG_LEVEL", "info"),

            database_url: env_var_or("DATABASE_URL", "data/marketpulse.db"),
            redis_url: std::env::var("REDIS_URL").ok().or_else(|| {
                let host = std::env::var("REDIS_HOST").ok()?;
                let port = std::env::var("REDIS_PORT").unwrap_or_else(|_| "6379".to_string());
                Some(format!("redis://{host}:{port}"))
            }),

            pinnacle_api_key: std::env::var("PINNACLE_API_KEY").ok(),
            betfair_app_key: std::env::var("BETFAIR_APP_KEY").ok(),
            betfair_session_token: std::env::var("BETFAIR_SESSION_TOKEN").ok(),
            alphavantage_api_key: std::env::var("ALPHAVANTAGE_API_KEY").ok(),
            newsapi_key: std::env::var("NEWSAPI_KEY").ok(),

            sendgrid_api_key: std::env::var("SENDGRID_API_KEY").ok(),
            telegram_bot_token: std::env::var("TELEGRAM_BOT_TOKEN").ok(),
            line_channel_token: std::env::var("LINE_CHANNEL_TOKEN").ok(),
            discord_webhook_url: std::env::var("DISCORD_WEBHOOK_URL").ok(),

            backup_path: std::path::PathBuf::from(env_var_or("BACKUP_PATH", "backups")),
            backup_retention_days,

            intervals,
            ensemble_weights: crate::risk::ensemble::EnsembleWeights::default(),
            liquid_leagues: std::env::var("LIQUID_LEAGUES")
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["epl".to_string(), "nba".to_string(), "nfl".to_string()]),
        })
    }

    /// `JWT_SECRET` is consumed by the (out-of-scope) API layer only; the data
    /// plane never signs or verifies tokens, so it is deliberately not read here.
    pub fn openai_api_key() -> Option<String> {
        std::env::var("OPENAI_API_KEY").ok()
    }
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_duration_secs(key: &str) -> EngineResult<Option<Duration>> {
    match std::env::var(key) {
        Ok(v) => v
            .parse::<u64>()
            .map(|s| Some(Duration::from_secs(s)))
            .map_err(|e| EngineError::Config(format!("{key}: {e}"))),
        Err(_) => Ok(None),
    }
}
