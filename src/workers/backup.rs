//! `Backup` (spec §4.6, daily 04:00): dumps the database to plain SQL,
//! gzips it into `BACKUP_PATH/super_dashboard_{YYYYMMDD_HHMMSS}.sql.gz`
//! (spec §6), prunes anything older than `BACKUP_RETENTION_DAYS`.

use crate::context::AppContext;
use crate::errors::{EngineError, EngineResult};
use async_trait::async_trait;
use chrono::Duration;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct BackupWorker {
    ctx: Arc<AppContext>,
}

impl BackupWorker {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }
}

fn render_sql(rows: &[(String, String, String, String)]) -> String {
    let mut sql = String::from(
        "CREATE TABLE IF NOT EXISTS entities (kind TEXT, id TEXT, data TEXT, updated_at TEXT, PRIMARY KEY (kind, id));\n",
    );
    for (kind, id, data, updated_at) in rows {
        sql.push_str(&format!(
            "INSERT INTO entities (kind, id, data, updated_at) VALUES ({}, {}, {}, {});\n",
            sql_quote(kind),
            sql_quote(id),
            sql_quote(data),
            sql_quote(updated_at),
        ));
    }
    sql
}

fn sql_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[async_trait]
impl crate::workers::Worker for BackupWorker {
    fn name(&self) -> &'static str {
        "Backup"
    }

    async fn run(&self, _cancel: &CancellationToken) -> EngineResult<()> {
        let now = self.ctx.clock.now();
        let rows = self.ctx.repos.dump_all().await?;
        if rows.is_empty() {
            tracing::info!("backup skipped: in-memory backend has nothing to dump");
            return Ok(());
        }
        let sql = render_sql(&rows);

        std::fs::create_dir_all(&self.ctx.config.backup_path)
            .map_err(|e| EngineError::Internal(format!("create backup dir: {e}")))?;

        let filename = format!("super_dashboard_{}.sql.gz", now.format("%Y%m%d_%H%M%S"));
        let path = self.ctx.config.backup_path.join(&filename);
        let file = std::fs::File::create(&path).map_err(|e| EngineError::Internal(format!("create backup file: {e}")))?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder
            .write_all(sql.as_bytes())
            .map_err(|e| EngineError::Internal(format!("write backup: {e}")))?;
        encoder
            .finish()
            .map_err(|e| EngineError::Internal(format!("finish backup: {e}")))?;
        tracing::info!(path = %path.display(), rows = rows.len(), "database backup written");

        self.prune_old_backups(now)?;
        Ok(())
    }
}

impl BackupWorker {
    fn prune_old_backups(&self, now: chrono::DateTime<chrono::Utc>) -> EngineResult<()> {
        let cutoff = now - Duration::days(self.ctx.config.backup_retention_days);
        let entries = match std::fs::read_dir(&self.ctx.config.backup_path) {
            Ok(entries) => entries,
            Err(_) => return Ok(()),
        };

        for entry in entries.filter_map(|e| e.ok()) {
            let Ok(metadata) = entry.metadata() else { continue };
            let Ok(modified) = metadata.modified() else { continue };
            let modified: chrono::DateTime<chrono::Utc> = modified.into();
            if modified < cutoff {
                if let Err(e) = std::fs::remove_file(entry.path()) {
                    tracing::warn!(path = %entry.path().display(), error = %e, "failed to prune old backup");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::Worker;
    use crate::repo::Repository;
    use crate::cache::CacheService;
    use crate::clock::FixedClock;
    use crate::config::WorkerIntervals;
    use crate::context::{Providers, Repos};
    use crate::domain::User;
    use crate::hub::RealtimeHub;
    use crate::notify::Notifier;
    use chrono::{TimeZone, Utc};

    #[test]
    fn render_sql_escapes_embedded_quotes() {
        let rows = vec![("user".to_string(), "1".to_string(), "O'Brien".to_string(), "now".to_string())];
        let sql = render_sql(&rows);
        assert!(sql.contains("'O''Brien'"));
    }

    fn test_ctx(now: chrono::DateTime<Utc>, db_path: std::path::PathBuf, backup_path: std::path::PathBuf) -> Arc<AppContext> {
        let config = Arc::new(crate::config::AppConfig {
            env: "test".into(),
            port: 0,
            use_mock_data: false,
            log_level: "error".into(),
            database_url: db_path.display().to_string(),
            redis_url: None,
            pinnacle_api_key: None,
            betfair_app_key: None,
            betfair_session_token: None,
            alphavantage_api_key: None,
            newsapi_key: None,
            sendgrid_api_key: None,
            telegram_bot_token: None,
            line_channel_token: None,
            discord_webhook_url: None,
            backup_path,
            backup_retention_days: 1,
            intervals: WorkerIntervals::default(),
            ensemble_weights: crate::risk::ensemble::EnsembleWeights::default(),
            liquid_leagues: vec!["epl".into()],
        });
        let store = crate::repo::sqlite::EntityStore::open(&db_path).expect("open sqlite store");
        Arc::new(AppContext {
            providers: Arc::new(Providers::from_config(&config)),
            notifier: Arc::new(Notifier::from_config(&config)),
            cache: Arc::new(CacheService::new()),
            hub: RealtimeHub::spawn(),
            clock: Arc::new(FixedClock::new(now)),
            repos: Arc::new(Repos::sqlite(store)),
            config,
        })
    }

    #[tokio::test]
    async fn writes_a_gzipped_dump_and_prunes_backups_past_retention() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 4, 0, 0).unwrap();
        let db_dir = tempfile::tempdir().unwrap();
        let backup_dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(now, db_dir.path().join("data.db"), backup_dir.path().to_path_buf());

        ctx.repos
            .users
            .create(User::new("dumped@example.test", "hash".into()))
            .await
            .unwrap();

        // A pre-existing backup old enough to exceed the 1-day retention window.
        let stale_path = backup_dir.path().join("super_dashboard_19990101_000000.sql.gz");
        std::fs::write(&stale_path, b"stale").unwrap();
        let stale_file = std::fs::File::options().write(true).open(&stale_path).unwrap();
        stale_file
            .set_modified(std::time::SystemTime::now() - std::time::Duration::from_secs(3 * 24 * 3600))
            .unwrap();

        let worker = BackupWorker::new(ctx.clone());
        worker.run(&CancellationToken::new()).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(backup_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(entries.len(), 1, "stale backup should be pruned, only today's dump remains");
        assert!(entries[0].file_name().to_string_lossy().starts_with("super_dashboard_20260301"));
    }
}
