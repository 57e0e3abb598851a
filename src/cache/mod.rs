//! Key/value cache with per-key-class TTLs plus topic pub/sub (spec §4.2),
//! backed by `dashmap` for the map and `tokio::sync::broadcast` per topic --
//! the teacher has no direct analogue for this, so the shape is grounded on
//! the odds-ingestion example's Redis-facade split between storage and pub/sub.

use crate::errors::{EngineError, EngineResult};
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

/// Topics used by the core (spec §4.2).
pub mod topics {
    pub const STOCKS: &str = "stocks";
    pub const ODDS: &str = "odds";
    pub const MATCHES: &str = "matches";
    pub const ALERTS: &str = "alerts";
    pub const NEWS: &str = "news";
    pub const PORTFOLIO: &str = "portfolio";
}

/// TTL policy table (spec §4.2).
pub mod ttl {
    use std::time::Duration;

    pub const QUOTE: Duration = Duration::from_secs(60);
    pub const ODDS_SNAPSHOT: Duration = Duration::from_secs(120);
    pub const OVERVIEW: Duration = Duration::from_secs(24 * 3600);
    pub const HISTORICAL: Duration = Duration::from_secs(3600);
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(exp) => now < exp,
            None => true,
        }
    }
}

/// Facade over the cache/pub-sub backend. `CacheService` is a plain struct
/// rather than a trait object since the crate only ships one backend; a
/// Redis-backed implementation would live behind the same method set.
pub struct CacheService {
    store: DashMap<String, Entry>,
    hashes: DashMap<String, DashMap<String, String>>,
    sorted_sets: DashMap<String, Vec<(String, f64)>>,
    counters: DashMap<String, (i64, Option<Instant>)>,
    topics: DashMap<String, broadcast::Sender<String>>,
}

impl Default for CacheService {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheService {
    pub fn new() -> Self {
        Self {
            store: DashMap::new(),
            hashes: DashMap::new(),
            sorted_sets: DashMap::new(),
            counters: DashMap::new(),
            topics: DashMap::new(),
        }
    }

    pub fn set(&self, key: &str, value: &str, ttl: Option<Duration>) {
        let expires_at = ttl.map(|d| Instant::now() + d);
        self.store.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> EngineResult<()> {
        let encoded = serde_json::to_string(value)?;
        self.set(key, &encoded, ttl);
        Ok(())
    }

    /// Returns `None` if the key is absent or its TTL has elapsed (spec §8:
    /// "a key set with TTL t returns NotFound at any read strictly after t").
    pub fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        match self.store.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
            Some(_) => {
                self.store.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> EngineResult<Option<T>> {
        match self.get(key) {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn del(&self, key: &str) {
        self.store.remove(key);
    }

    pub fn hset(&self, key: &str, field: &str, value: &str) {
        self.hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
    }

    pub fn hget(&self, key: &str, field: &str) -> Option<String> {
        self.hashes.get(key)?.get(field).map(|v| v.clone())
    }

    pub fn hgetall(&self, key: &str) -> Vec<(String, String)> {
        match self.hashes.get(key) {
            Some(map) => map.iter().map(|e| (e.key().clone(), e.value().clone())).collect(),
            None => Vec::new(),
        }
    }

    pub fn zadd(&self, key: &str, member: &str, score: f64) {
        let mut set = self.sorted_sets.entry(key.to_string()).or_default();
        set.retain(|(m, _)| m != member);
        set.push((member.to_string(), score));
        set.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    }

    pub fn zrange(&self, key: &str, start: usize, stop: usize) -> Vec<(String, f64)> {
        match self.sorted_sets.get(key) {
            Some(set) => {
                let end = stop.min(set.len().saturating_sub(1));
                if set.is_empty() || start > end {
                    Vec::new()
                } else {
                    set[start..=end].to_vec()
                }
            }
            None => Vec::new(),
        }
    }

    /// Increments a counter bounded by `ttl`, resetting it once the window
    /// elapses (spec §4.2 rate-limit counters).
    pub fn incr(&self, key: &str, ttl: Duration) -> i64 {
        let now = Instant::now();
        let mut entry = self.counters.entry(key.to_string()).or_insert((0, None));
        let expired = entry.1.map(|exp| now >= exp).unwrap_or(true);
        if expired {
            entry.0 = 0;
            entry.1 = Some(now + ttl);
        }
        entry.0 += 1;
        entry.0
    }

    pub fn publish(&self, topic: &str, payload: &str) {
        if let Some(sender) = self.topics.get(topic) {
            let _ = sender.send(payload.to_string());
        }
    }

    pub fn publish_json<T: Serialize>(&self, topic: &str, payload: &T) -> EngineResult<()> {
        let encoded = serde_json::to_string(payload)?;
        self.publish(topic, &encoded);
        Ok(())
    }

    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<String> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(1024).0)
            .subscribe()
    }
}

pub type SharedCache = Arc<CacheService>;

impl From<broadcast::error::RecvError> for EngineError {
    fn from(e: broadcast::error::RecvError) -> Self {
        EngineError::ChannelClosed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn get_after_ttl_elapses_returns_none() {
        let cache = CacheService::new();
        cache.set("k", "v", Some(Duration::from_millis(1)));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn get_without_ttl_never_expires() {
        let cache = CacheService::new();
        cache.set("k", "v", None);
        assert_eq!(cache.get("k"), Some("v".to_string()));
    }

    #[test]
    fn incr_resets_after_window() {
        let cache = CacheService::new();
        assert_eq!(cache.incr("rl:a:1s", Duration::from_millis(5)), 1);
        assert_eq!(cache.incr("rl:a:1s", Duration::from_millis(5)), 2);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.incr("rl:a:1s", Duration::from_millis(5)), 1);
    }

    #[test]
    fn zrange_returns_ascending_by_score() {
        let cache = CacheService::new();
        cache.zadd("lb", "b", 2.0);
        cache.zadd("lb", "a", 1.0);
        let range = cache.zrange("lb", 0, 1);
        assert_eq!(range, vec![("a".to_string(), 1.0), ("b".to_string(), 2.0)]);
    }

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let cache = CacheService::new();
        let mut rx = cache.subscribe(topics::STOCKS);
        cache.publish(topics::STOCKS, "hello");
        let msg = rx.recv().await.unwrap();
        assert_eq!(msg, "hello");
    }
}
