//! Shared test doubles: a settable clock and service wiring over the memory store.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;

use crate::{repository::Repository, services::Services};

pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, delta: TimeDelta) {
        *self.lock_clock() += delta;
    }

    pub fn advance_days(&self, days: i64) {
        self.advance(TimeDelta::days(days));
    }

    fn lock_clock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        self.0.lock().expect("clock mutex")
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// Fixed starting instant for scenario tests
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

/// Services over an empty memory store, plus the clock driving them
pub fn memory_services() -> (Services, Arc<MutableClock>) {
    let clock = Arc::new(MutableClock::new(epoch()));
    let services = Services::new(Repository::in_memory(), clock.clone());
    (services, clock)
}
