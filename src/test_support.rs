//! Deterministic helpers shared by unit tests.

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;
use std::sync::atomic::{AtomicI64, Ordering};

/// Clock that advances one second on every reading.
///
/// Records created through it get strictly increasing timestamps, so
/// creation order is observable without sleeping.
#[derive(Debug)]
pub(crate) struct StepClock {
    start: DateTime<Utc>,
    ticks: AtomicI64,
}

impl StepClock {
    pub(crate) fn new() -> Self {
        Self::starting_at(
            Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0)
                .single()
                .expect("fixed start timestamp is valid"),
        )
    }

    pub(crate) const fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            start,
            ticks: AtomicI64::new(0),
        }
    }

    /// Moves the clock forward without taking a reading.
    pub(crate) fn advance(&self, by: Duration) {
        self.ticks.fetch_add(by.num_seconds(), Ordering::SeqCst);
    }
}

impl Default for StepClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StepClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        self.start + Duration::seconds(tick)
    }
}
