//! In-memory backend (spec §4.5 #2): a map guarded by a mutex, used for tests
//! and `USE_MOCK_DATA=true`. Skips transactional isolation by contract.

use crate::errors::{EngineError, EngineResult};
use crate::repo::Entity;
use std::collections::HashMap;
use std::sync::Mutex;

pub struct InMemoryRepository<T: Entity> {
    rows: Mutex<HashMap<String, T>>,
}

impl<T: Entity> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
        }
    }

    pub async fn create(&self, item: T) -> EngineResult<T> {
        let key = item.id().to_string();
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&key) {
            return Err(EngineError::Conflict(format!("{} {key} already exists", T::KIND)));
        }
        rows.insert(key, item.clone());
        Ok(item)
    }

    pub async fn get(&self, id: &T::Id) -> EngineResult<T> {
        let key = id.to_string();
        self.rows
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("{} {key}", T::KIND)))
    }

    pub async fn list(&self) -> EngineResult<Vec<T>> {
        Ok(self.rows.lock().unwrap().values().cloned().collect())
    }

    pub async fn update(&self, item: T) -> EngineResult<T> {
        let key = item.id().to_string();
        let mut rows = self.rows.lock().unwrap();
        if !rows.contains_key(&key) {
            return Err(EngineError::NotFound(format!("{} {key}", T::KIND)));
        }
        rows.insert(key, item.clone());
        Ok(item)
    }

    /// Inserts or replaces regardless of prior existence (spec §8: "upsert of
    /// the same Position twice yields the same state as upsert once").
    pub async fn upsert(&self, item: T) -> EngineResult<T> {
        let key = item.id().to_string();
        self.rows.lock().unwrap().insert(key, item.clone());
        Ok(item)
    }

    pub async fn delete(&self, id: &T::Id) -> EngineResult<()> {
        let key = id.to_string();
        self.rows
            .lock()
            .unwrap()
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| EngineError::NotFound(format!("{} {key}", T::KIND)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Team, TeamId};
    use rust_decimal_macros::dec;

    fn sample_team() -> Team {
        Team {
            id: TeamId::new(),
            name: "Arsenal".into(),
            country: "England".into(),
            elo_rating: dec!(1800),
        }
    }

    #[tokio::test]
    async fn create_then_get_then_delete_then_get_not_found() {
        let repo = InMemoryRepository::<Team>::new();
        let team = sample_team();
        let id = team.id;
        repo.create(team).await.unwrap();
        assert!(repo.get(&id).await.is_ok());
        repo.delete(&id).await.unwrap();
        assert!(matches!(repo.get(&id).await, Err(EngineError::NotFound(_))));
    }

    #[tokio::test]
    async fn duplicate_create_conflicts() {
        let repo = InMemoryRepository::<Team>::new();
        let team = sample_team();
        repo.create(team.clone()).await.unwrap();
        assert!(matches!(repo.create(team).await, Err(EngineError::Conflict(_))));
    }

    #[tokio::test]
    async fn upsert_twice_replaces_not_accumulates() {
        let repo = InMemoryRepository::<Team>::new();
        let mut team = sample_team();
        repo.upsert(team.clone()).await.unwrap();
        team.elo_rating = dec!(1850);
        repo.upsert(team.clone()).await.unwrap();
        let rows = repo.list().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].elo_rating, dec!(1850));
    }
}
