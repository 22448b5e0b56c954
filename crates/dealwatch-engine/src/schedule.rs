//! Cycle timing.
//!
//! The inter-cycle delay comes from a peak/off-peak time-of-day table. The
//! clock is injected so tests can simulate hours passing without sleeping.

use crate::config::SchedulingConfig;
use chrono::{DateTime, Timelike, Utc};
use std::sync::Mutex;
use std::time::Duration;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for tests.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Peak/off-peak interval table.
#[derive(Debug, Clone)]
pub struct Schedule {
    peak_start_hour: u32,
    peak_end_hour: u32,
    peak_interval: Duration,
    interval: Duration,
}

impl Schedule {
    pub fn from_config(config: &SchedulingConfig) -> Self {
        Self {
            peak_start_hour: config.peak_start_hour.min(23),
            peak_end_hour: config.peak_end_hour.min(23),
            peak_interval: Duration::from_secs(config.peak_interval_secs),
            interval: Duration::from_secs(config.interval_secs),
        }
    }

    /// Delay until the next cycle, given the current time.
    ///
    /// The peak range is inclusive on both ends and may wrap midnight
    /// (e.g. 22..2).
    pub fn interval_at(&self, now: DateTime<Utc>) -> Duration {
        if self.is_peak_hour(now.hour()) {
            self.peak_interval
        } else {
            self.interval
        }
    }

    fn is_peak_hour(&self, hour: u32) -> bool {
        if self.peak_start_hour <= self.peak_end_hour {
            (self.peak_start_hour..=self.peak_end_hour).contains(&hour)
        } else {
            hour >= self.peak_start_hour || hour <= self.peak_end_hour
        }
    }
}
