//! Typed persistence (spec §4.5), behind two interchangeable backends selected
//! by `AppConfig::use_mock_data` (spec §9 decision: tagged variants, no
//! inheritance). SQL schema detail is out of scope (spec §1); the persistent
//! backend stores one generic `(kind, id, data, updated_at)` blob table plus
//! entity-level query-by-scan, following the teacher's single-writer-task
//! pattern in `db.rs` but generalized across all twenty entity kinds.

pub mod entities;
pub mod memory;
pub mod sqlite;

use crate::errors::EngineResult;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

/// Implemented by every persisted entity: a stable storage "kind" and its own
/// id rendered as a string key.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    const KIND: &'static str;
    type Id: ToString + Send + Sync;
    fn id(&self) -> Self::Id;
}

/// `Create/Get/List/Update/Delete` (spec §4.5); every method is cancellation-
/// safe simply by being an ordinary future the caller may drop.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    async fn create(&self, item: T) -> EngineResult<T>;
    async fn get(&self, id: &T::Id) -> EngineResult<T>;
    async fn list(&self) -> EngineResult<Vec<T>>;
    async fn update(&self, item: T) -> EngineResult<T>;
    async fn delete(&self, id: &T::Id) -> EngineResult<()>;
    /// Insert-or-replace, used by upsert-shaped flows (latest StockPrice,
    /// Position sizing) where callers never care whether a prior row existed.
    async fn upsert(&self, item: T) -> EngineResult<T>;
}

/// Selects a backend for one entity kind at startup (spec §9: tagged variant,
/// not a trait object hierarchy).
pub enum Backend<T: Entity> {
    Memory(memory::InMemoryRepository<T>),
    Sqlite(sqlite::SqliteRepository<T>),
}

#[async_trait]
impl<T: Entity> Repository<T> for Backend<T> {
    async fn create(&self, item: T) -> EngineResult<T> {
        match self {
            Backend::Memory(r) => r.create(item).await,
            Backend::Sqlite(r) => r.create(item).await,
        }
    }

    async fn get(&self, id: &T::Id) -> EngineResult<T> {
        match self {
            Backend::Memory(r) => r.get(id).await,
            Backend::Sqlite(r) => r.get(id).await,
        }
    }

    async fn list(&self) -> EngineResult<Vec<T>> {
        match self {
            Backend::Memory(r) => r.list().await,
            Backend::Sqlite(r) => r.list().await,
        }
    }

    async fn update(&self, item: T) -> EngineResult<T> {
        match self {
            Backend::Memory(r) => r.update(item).await,
            Backend::Sqlite(r) => r.update(item).await,
        }
    }

    async fn delete(&self, id: &T::Id) -> EngineResult<()> {
        match self {
            Backend::Memory(r) => r.delete(id).await,
            Backend::Sqlite(r) => r.delete(id).await,
        }
    }

    async fn upsert(&self, item: T) -> EngineResult<T> {
        match self {
            Backend::Memory(r) => r.upsert(item).await,
            Backend::Sqlite(r) => r.upsert(item).await,
        }
    }
}

impl<T: Entity> Backend<T> {
    pub fn memory() -> Self {
        Backend::Memory(memory::InMemoryRepository::new())
    }

    pub fn sqlite(store: sqlite::EntityStore) -> Self {
        Backend::Sqlite(sqlite::SqliteRepository::new(store))
    }
}
