//! Single clock abstraction injected into workers and the alert engine so tests
//! can virtualize time for the daily workers (`DailyPicks`, `DataCleanup`, `Backup`)
//! without sleeping real wall-clock seconds (design notes, spec §9).

use chrono::{DateTime, Utc};
use std::sync::Arc;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock whose value is set explicitly -- used by tests that exercise
/// `DailyPicks`/`DataCleanup`/`Backup` against fixed instants (spec §8 scenarios 5-6).
#[derive(Clone)]
pub struct FixedClock {
    now: Arc<std::sync::Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(std::sync::Mutex::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut guard = self.now.lock().unwrap();
        *guard += delta;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub type SharedClock = Arc<dyn Clock>;
