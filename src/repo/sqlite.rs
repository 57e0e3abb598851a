//! Persistent backend: a single writer task owns the one `rusqlite::Connection`
//! and every repository talks to it over a bounded command channel, exactly
//! the shape of the teacher's `db::run_db_writer` -- generalized from the
//! teacher's per-table `DbCommand` variants to one generic JSON-blob table
//! (spec §1 non-goal: "SQL schema beyond the logical entities" is out of
//! scope) keyed by `(kind, id)`, following SPEC_FULL.md's persistence
//! decision.

use crate::errors::{EngineError, EngineResult};
use crate::repo::Entity;
use rusqlite::Connection;
use std::marker::PhantomData;
use std::path::Path;
use tokio::sync::{mpsc, oneshot};

enum StoreCommand {
    Insert {
        kind: &'static str,
        id: String,
        data: String,
        reply: oneshot::Sender<EngineResult<()>>,
    },
    Upsert {
        kind: &'static str,
        id: String,
        data: String,
        reply: oneshot::Sender<EngineResult<()>>,
    },
    Get {
        kind: &'static str,
        id: String,
        reply: oneshot::Sender<EngineResult<Option<String>>>,
    },
    List {
        kind: &'static str,
        reply: oneshot::Sender<EngineResult<Vec<String>>>,
    },
    Delete {
        kind: &'static str,
        id: String,
        reply: oneshot::Sender<EngineResult<bool>>,
    },
    Maintenance {
        reply: oneshot::Sender<EngineResult<()>>,
    },
    DumpAll {
        reply: oneshot::Sender<EngineResult<Vec<(String, String, String, String)>>>,
    },
}

/// Cloneable handle to the writer task; the task itself holds the only
/// `Connection` (spec §5: "callers must not hold rows across awaits").
#[derive(Clone)]
pub struct EntityStore {
    tx: mpsc::Sender<StoreCommand>,
}

impl EntityStore {
    pub fn open(path: &Path) -> EngineResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| EngineError::Database(format!("create dir: {e}")))?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;
             CREATE TABLE IF NOT EXISTS entities (
                 kind TEXT NOT NULL,
                 id TEXT NOT NULL,
                 data TEXT NOT NULL,
                 updated_at TEXT NOT NULL,
                 PRIMARY KEY (kind, id)
             );",
        )?;

        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(run_writer(conn, rx));
        tracing::info!(path = %path.display(), "entity store opened");
        Ok(Self { tx })
    }

    async fn send(&self, cmd: StoreCommand) -> EngineResult<()> {
        self.tx
            .send(cmd)
            .await
            .map_err(|e| EngineError::ChannelClosed(e.to_string()))
    }

    /// `DataCleanup`'s database maintenance hook (spec §4.6). sqlite has no
    /// `VACUUM ANALYZE`; `PRAGMA optimize` is its equivalent low-cost hint.
    pub async fn run_maintenance(&self) -> EngineResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(StoreCommand::Maintenance { reply: reply_tx }).await?;
        reply_rx.await.map_err(|e| EngineError::ChannelClosed(e.to_string()))?
    }

    /// `Backup`'s "platform-provided database dump" (spec §4.6): every row
    /// as `(kind, id, data, updated_at)`, rendered to `INSERT` statements by
    /// the caller.
    pub async fn dump_all(&self) -> EngineResult<Vec<(String, String, String, String)>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(StoreCommand::DumpAll { reply: reply_tx }).await?;
        reply_rx.await.map_err(|e| EngineError::ChannelClosed(e.to_string()))?
    }
}

async fn run_writer(conn: Connection, mut rx: mpsc::Receiver<StoreCommand>) {
    tracing::info!("entity store writer task started");
    while let Some(cmd) = rx.recv().await {
        match cmd {
            StoreCommand::Insert { kind, id, data, reply } => {
                let result = insert(&conn, kind, &id, &data);
                let _ = reply.send(result);
            }
            StoreCommand::Upsert { kind, id, data, reply } => {
                let result = upsert(&conn, kind, &id, &data);
                let _ = reply.send(result);
            }
            StoreCommand::Get { kind, id, reply } => {
                let result = get(&conn, kind, &id);
                let _ = reply.send(result);
            }
            StoreCommand::List { kind, reply } => {
                let result = list(&conn, kind);
                let _ = reply.send(result);
            }
            StoreCommand::Delete { kind, id, reply } => {
                let result = delete(&conn, kind, &id);
                let _ = reply.send(result);
            }
            StoreCommand::Maintenance { reply } => {
                let result = conn.execute_batch("PRAGMA optimize;").map_err(EngineError::from);
                let _ = reply.send(result);
            }
            StoreCommand::DumpAll { reply } => {
                let result = dump_all(&conn);
                let _ = reply.send(result);
            }
        }
    }
    tracing::info!("entity store writer task shutting down");
}

fn insert(conn: &Connection, kind: &str, id: &str, data: &str) -> EngineResult<()> {
    let exists: bool = conn
        .query_row(
            "SELECT 1 FROM entities WHERE kind = ?1 AND id = ?2",
            rusqlite::params![kind, id],
            |_| Ok(true),
        )
        .unwrap_or(false);
    if exists {
        return Err(EngineError::Conflict(format!("{kind} {id} already exists")));
    }
    conn.execute(
        "INSERT INTO entities (kind, id, data, updated_at) VALUES (?1, ?2, ?3, datetime('now'))",
        rusqlite::params![kind, id, data],
    )?;
    Ok(())
}

fn upsert(conn: &Connection, kind: &str, id: &str, data: &str) -> EngineResult<()> {
    conn.execute(
        "INSERT INTO entities (kind, id, data, updated_at) VALUES (?1, ?2, ?3, datetime('now'))
         ON CONFLICT(kind, id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
        rusqlite::params![kind, id, data],
    )?;
    Ok(())
}

fn get(conn: &Connection, kind: &str, id: &str) -> EngineResult<Option<String>> {
    match conn.query_row(
        "SELECT data FROM entities WHERE kind = ?1 AND id = ?2",
        rusqlite::params![kind, id],
        |row| row.get::<_, String>(0),
    ) {
        Ok(data) => Ok(Some(data)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn list(conn: &Connection, kind: &str) -> EngineResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT data FROM entities WHERE kind = ?1")?;
    let rows = stmt.query_map(rusqlite::params![kind], |row| row.get::<_, String>(0))?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

fn dump_all(conn: &Connection) -> EngineResult<Vec<(String, String, String, String)>> {
    let mut stmt = conn.prepare("SELECT kind, id, data, updated_at FROM entities ORDER BY kind, id")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?, row.get::<_, String>(3)?))
    })?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

fn delete(conn: &Connection, kind: &str, id: &str) -> EngineResult<bool> {
    let affected = conn.execute(
        "DELETE FROM entities WHERE kind = ?1 AND id = ?2",
        rusqlite::params![kind, id],
    )?;
    Ok(affected > 0)
}

/// Typed view over `EntityStore` for one entity kind.
pub struct SqliteRepository<T: Entity> {
    store: EntityStore,
    _marker: PhantomData<T>,
}

impl<T: Entity> SqliteRepository<T> {
    pub fn new(store: EntityStore) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    pub async fn create(&self, item: T) -> EngineResult<T> {
        let id = item.id().to_string();
        let data = serde_json::to_string(&item)?;
        let (reply_tx, reply_rx) = oneshot::channel();
        self.store
            .send(StoreCommand::Insert {
                kind: T::KIND,
                id,
                data,
                reply: reply_tx,
            })
            .await?;
        reply_rx
            .await
            .map_err(|e| EngineError::ChannelClosed(e.to_string()))??;
        Ok(item)
    }

    /// Insert-or-replace (spec §8 upsert idempotence).
    pub async fn upsert(&self, item: T) -> EngineResult<T> {
        let id = item.id().to_string();
        let data = serde_json::to_string(&item)?;
        let (reply_tx, reply_rx) = oneshot::channel();
        self.store
            .send(StoreCommand::Upsert {
                kind: T::KIND,
                id,
                data,
                reply: reply_tx,
            })
            .await?;
        reply_rx
            .await
            .map_err(|e| EngineError::ChannelClosed(e.to_string()))??;
        Ok(item)
    }

    pub async fn get(&self, id: &T::Id) -> EngineResult<T> {
        let id = id.to_string();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.store
            .send(StoreCommand::Get {
                kind: T::KIND,
                id: id.clone(),
                reply: reply_tx,
            })
            .await?;
        let data = reply_rx
            .await
            .map_err(|e| EngineError::ChannelClosed(e.to_string()))??
            .ok_or_else(|| EngineError::NotFound(format!("{} {id}", T::KIND)))?;
        Ok(serde_json::from_str(&data)?)
    }

    pub async fn list(&self) -> EngineResult<Vec<T>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.store
            .send(StoreCommand::List {
                kind: T::KIND,
                reply: reply_tx,
            })
            .await?;
        let rows = reply_rx
            .await
            .map_err(|e| EngineError::ChannelClosed(e.to_string()))??;
        Ok(rows
            .into_iter()
            .filter_map(|raw| serde_json::from_str(&raw).ok())
            .collect())
    }

    pub async fn update(&self, item: T) -> EngineResult<T> {
        self.get(&item.id()).await?;
        self.upsert(item).await
    }

    pub async fn delete(&self, id: &T::Id) -> EngineResult<()> {
        let id_str = id.to_string();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.store
            .send(StoreCommand::Delete {
                kind: T::KIND,
                id: id_str.clone(),
                reply: reply_tx,
            })
            .await?;
        let deleted = reply_rx
            .await
            .map_err(|e| EngineError::ChannelClosed(e.to_string()))??;
        if deleted {
            Ok(())
        } else {
            Err(EngineError::NotFound(format!("{} {id_str}", T::KIND)))
        }
    }
}
