//! Binary entry point: startup order is configuration -> logger -> cache ->
//! repositories -> providers -> notifier -> hub -> workers -> HTTP layer
//! (spec §4.8), mirroring the teacher's `main.rs` staged bring-up.

mod alerts;
mod cache;
mod clock;
mod config;
mod context;
mod domain;
mod errors;
mod hub;
mod notify;
mod providers;
mod repo;
mod risk;
mod scheduler;
mod server;
mod workers;

use config::AppConfig;
use context::{AppContext, Providers, Repos};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("marketpulse data plane starting");

    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "configuration error");
            std::process::exit(1);
        }
    };
    let config = Arc::new(config);

    let cache = Arc::new(cache::CacheService::new());

    let repos = if config.use_mock_data {
        Repos::in_memory()
    } else {
        match repo::sqlite::EntityStore::open(std::path::Path::new(&config.database_url)) {
            Ok(store) => Repos::sqlite(store),
            Err(e) => {
                tracing::error!(error = %e, "database init error");
                std::process::exit(1);
            }
        }
    };
    let repos = Arc::new(repos);

    let providers = Arc::new(Providers::from_config(&config));
    let notifier = Arc::new(notify::Notifier::from_config(&config));
    let hub = hub::RealtimeHub::spawn();
    let clock: clock::SharedClock = Arc::new(clock::SystemClock);

    let ctx = Arc::new(AppContext {
        config: config.clone(),
        cache,
        hub,
        notifier,
        clock,
        repos,
        providers,
    });

    let scheduler_ctx = ctx.clone();
    let scheduler_task = tokio::spawn(async move {
        scheduler::run(scheduler_ctx).await;
    });

    let app = server::router(ctx);
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(%addr, "http surface listening");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, "bind error");
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server error");
    }

    let _ = scheduler_task.await;
}
