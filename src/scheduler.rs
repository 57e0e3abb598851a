//! Scheduler / lifecycle (spec §4.8, C8): launches every worker on its own
//! task under one root cancellation context, and orchestrates graceful
//! shutdown on SIGINT/SIGTERM.

use crate::alerts::AlertEngine;
use crate::context::AppContext;
use crate::workers::{
    analytics_aggregation::AnalyticsAggregationWorker, backup::BackupWorker, data_cleanup::DataCleanupWorker,
    daily_picks::DailyPicksWorker, match_status::MatchStatusWorker, news_sync::NewsSyncWorker,
    odds_sync::OddsSyncWorker, sentiment_analysis::SentimentAnalysisWorker, stock_sync::StockSyncWorker,
    value_bet_calculator::ValueBetCalculatorWorker, Worker,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Starts every periodic pipeline and blocks until a shutdown signal arrives
/// and every worker has wound down (or the grace period elapses).
pub async fn run(ctx: Arc<AppContext>) {
    let cancel = CancellationToken::new();
    let mut tasks = JoinSet::new();

    macro_rules! spawn_ticker {
        ($worker:expr, $interval:expr) => {{
            let worker: Arc<dyn Worker> = Arc::new($worker);
            let cancel = cancel.clone();
            tasks.spawn(crate::workers::run_ticker(worker, $interval, cancel));
        }};
    }
    macro_rules! spawn_daily {
        ($worker:expr, $hour:expr, $minute:expr) => {{
            let worker: Arc<dyn Worker> = Arc::new($worker);
            let cancel = cancel.clone();
            let clock = ctx.clock.clone();
            tasks.spawn(crate::workers::run_daily(worker, $hour, $minute, clock, cancel));
        }};
    }

    let intervals = ctx.config.intervals.clone();
    spawn_ticker!(OddsSyncWorker::new(ctx.clone()), intervals.odds_sync);
    spawn_ticker!(StockSyncWorker::new(ctx.clone()), intervals.stock_sync);
    spawn_ticker!(MatchStatusWorker::new(ctx.clone()), intervals.match_status);
    spawn_ticker!(NewsSyncWorker::new(ctx.clone()), intervals.news_sync);
    spawn_ticker!(SentimentAnalysisWorker::new(ctx.clone()), intervals.sentiment_analysis);
    spawn_ticker!(ValueBetCalculatorWorker::new(ctx.clone()), intervals.value_bet_calculator);
    spawn_ticker!(AnalyticsAggregationWorker::new(ctx.clone()), intervals.analytics_aggregation);

    let alert_engine: Arc<dyn Worker> = Arc::new(AlertEngine::new(
        ctx.repos.clone(),
        ctx.notifier.clone(),
        ctx.hub.clone(),
        ctx.clock.clone(),
    ));
    tasks.spawn(crate::workers::run_ticker(alert_engine, intervals.alert_checker, cancel.clone()));

    spawn_daily!(DailyPicksWorker::new(ctx.clone()), 8, 0);
    spawn_daily!(DataCleanupWorker::new(ctx.clone()), 3, 0);
    spawn_daily!(BackupWorker::new(ctx.clone()), 4, 0);

    wait_for_shutdown_signal().await;
    tracing::info!("shutdown signal received, cancelling workers");
    cancel.cancel();

    match tokio::time::timeout(SHUTDOWN_GRACE, async {
        while tasks.join_next().await.is_some() {}
    })
    .await
    {
        Ok(()) => tracing::info!("all workers stopped cleanly"),
        Err(_) => tracing::warn!("shutdown grace period elapsed with workers still running"),
    }

    ctx.hub.drain().await;
    tracing::info!("scheduler shutdown complete");
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
