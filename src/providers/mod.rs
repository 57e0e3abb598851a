//! Provider clients (spec §4.1): thin, typed HTTP wrappers around external
//! vendors, sharing one base that enforces rate limiting, a per-call
//! deadline, auth header injection, and response classification. Grounded on
//! the teacher's `kalshi::client` wrapper shape, with the `governor`
//! token-bucket limiter pulled in from the odds-ingestion example (no
//! provider client in the teacher enforces rate limits at all).

pub mod news;
pub mod odds;
pub mod quotes;

use crate::errors::{EngineError, EngineResult};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

type DirectRateLimiter = RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>;

/// Shared by every vendor client (spec §4.1): one `reqwest::Client`, one
/// token bucket sized `tokens_per_second` wide, one auth header.
pub struct ProviderBase {
    pub(crate) http: reqwest::Client,
    limiter: DirectRateLimiter,
    auth_header: Option<(&'static str, String)>,
}

impl ProviderBase {
    pub fn new(tokens_per_second: u32, auth_header: Option<(&'static str, String)>) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(tokens_per_second.max(1)).unwrap());
        Self {
            http: reqwest::Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .expect("reqwest client builds with a static timeout"),
            limiter: RateLimiter::direct(quota),
            auth_header,
        }
    }

    /// Waits for a token, respecting cancellation (spec §4.1: "a call that
    /// finds no token waits until one becomes available or until the context
    /// is cancelled"; "if the caller cancels, the call returns without
    /// consuming a token" holds because `select!` drops the `until_ready`
    /// future on the cancel branch, and `governor` only commits the token
    /// once that future resolves).
    pub async fn acquire(&self, cancel: &tokio_util::sync::CancellationToken) -> EngineResult<()> {
        tokio::select! {
            _ = self.limiter.until_ready() => Ok(()),
            _ = cancel.cancelled() => Err(EngineError::Cancelled),
        }
    }

    pub fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, url);
        if let Some((header, value)) = &self.auth_header {
            builder = builder.header(*header, value.clone());
        }
        builder
    }

    /// Classifies a response per spec §4.1 point 4: any status >= 400 becomes
    /// `ProviderError`, decode failure becomes `Parse`.
    pub async fn decode<T: serde::de::DeserializeOwned>(&self, response: reqwest::Response) -> EngineResult<T> {
        let status = response.status();
        if status.as_u16() >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::ProviderError {
                status: status.as_u16(),
                body,
            });
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| EngineError::Parse(format!("{e}: {body}")))
    }
}
