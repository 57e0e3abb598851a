//! The eleven periodic pipelines (spec §4.6, C6). Each worker implements the
//! shared runtime contract: bind dependencies at construction, `run` once
//! immediately then on every tick, re-entrant-safe but never called
//! concurrently with itself. Grounded on the teacher's `kalshi::scanner`
//! interval-loop shape, generalized into one runtime function shared by every
//! worker instead of one bespoke loop per feed.

pub mod analytics_aggregation;
pub mod backup;
pub mod data_cleanup;
pub mod daily_picks;
pub mod match_status;
pub mod news_sync;
pub mod odds_sync;
pub mod sentiment_analysis;
pub mod stock_sync;
pub mod value_bet_calculator;

use crate::errors::EngineResult;
use async_trait::async_trait;
use chrono::Utc;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait Worker: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self, cancel: &CancellationToken) -> EngineResult<()>;
}

/// Runs `worker` once immediately, then every `interval` until `cancel`
/// fires. A run that panics is caught at this boundary and logged; the
/// ticker keeps going (spec §7: "per-worker panics are caught at the ticker
/// boundary ... the ticker continues"). A run that overruns its interval
/// logs a warning and the next tick fires immediately (spec §4.6).
pub async fn run_ticker(worker: Arc<dyn Worker>, interval: Duration, cancel: CancellationToken) {
    loop {
        if cancel.is_cancelled() {
            break;
        }
        let started = Instant::now();
        let outcome = AssertUnwindSafe(worker.run(&cancel)).catch_unwind_safe().await;
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(crate::errors::EngineError::Cancelled)) => {}
            Ok(Err(e)) => tracing::error!(worker = worker.name(), error = %e, "worker run failed"),
            Err(_) => tracing::error!(worker = worker.name(), "worker run panicked"),
        }

        let elapsed = started.elapsed();
        if elapsed >= interval {
            tracing::warn!(worker = worker.name(), ?elapsed, "run exceeded interval, firing next tick immediately");
            continue;
        }
        tokio::select! {
            _ = tokio::time::sleep(interval - elapsed) => {}
            _ = cancel.cancelled() => break,
        }
    }
    tracing::info!(worker = worker.name(), "ticker stopped");
}

/// Runs `worker` once per day at `hour:minute` local-equivalent UTC time,
/// using the injected clock so tests can virtualize it (spec §9: daily
/// workers use the shared clock abstraction).
pub async fn run_daily(
    worker: Arc<dyn Worker>,
    hour: u32,
    minute: u32,
    clock: crate::clock::SharedClock,
    cancel: CancellationToken,
) {
    loop {
        if cancel.is_cancelled() {
            break;
        }
        let wait = duration_until_next(clock.now(), hour, minute);
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = cancel.cancelled() => break,
        }
        if cancel.is_cancelled() {
            break;
        }
        let outcome = AssertUnwindSafe(worker.run(&cancel)).catch_unwind_safe().await;
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(worker = worker.name(), error = %e, "daily worker run failed"),
            Err(_) => tracing::error!(worker = worker.name(), "daily worker run panicked"),
        }
    }
    tracing::info!(worker = worker.name(), "daily scheduler stopped");
}

fn duration_until_next(now: chrono::DateTime<Utc>, hour: u32, minute: u32) -> Duration {
    let today_target = now
        .date_naive()
        .and_hms_opt(hour, minute, 0)
        .expect("valid hour/minute");
    let today_target = today_target.and_utc();
    let target = if today_target > now {
        today_target
    } else {
        today_target + chrono::Duration::days(1)
    };
    (target - now).to_std().unwrap_or(Duration::from_secs(60))
}

/// Small helper trait so `catch_unwind` composes with `.await` without
/// pulling in `futures::FutureExt` for one call site.
trait CatchUnwindSafe: std::future::Future {
    fn catch_unwind_safe<'a>(
        self,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = std::thread::Result<Self::Output>> + Send + 'a>>
    where
        Self: Sized + Send + 'a,
        Self::Output: Send;
}

impl<F> CatchUnwindSafe for AssertUnwindSafe<F>
where
    F: std::future::Future + Send,
    F::Output: Send,
{
    fn catch_unwind_safe<'a>(
        self,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = std::thread::Result<Self::Output>> + Send + 'a>>
    where
        Self: Sized + Send + 'a,
    {
        Box::pin(async move {
            let fut = self.0;
            futures_util::FutureExt::catch_unwind(AssertUnwindSafe(fut)).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn duration_until_next_same_day_when_target_in_future() {
        let now = Utc.with_ymd_and_hms(2025, 12, 10, 2, 0, 0).unwrap();
        let wait = duration_until_next(now, 3, 0);
        assert_eq!(wait, Duration::from_secs(3600));
    }

    #[test]
    fn duration_until_next_rolls_to_tomorrow_when_target_passed() {
        let now = Utc.with_ymd_and_hms(2025, 12, 10, 5, 0, 0).unwrap();
        let wait = duration_until_next(now, 3, 0);
        assert_eq!(wait, Duration::from_secs(22 * 3600));
    }
}
