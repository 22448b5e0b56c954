//! Cycle and session counters.
//!
//! Counters are carried in an explicit accumulator that each cycle fills
//! and returns, and the caller aggregates, so a single cycle is
//! deterministic to test in isolation.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counters for one discovery cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleMetrics {
    /// Products extracted across all workers and the deals page.
    pub products_scraped: usize,
    /// Deals surviving analysis, dedup, and ranking.
    pub deals_found: usize,
    /// Messages delivered by the broadcast stage.
    pub messages_sent: usize,
    /// Isolated per-item failures observed during the cycle.
    pub errors: usize,
}

impl CycleMetrics {
    pub fn record_error(&mut self) {
        self.errors += 1;
    }
}

/// Aggregate counters across cycles, readable by the command front end.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionStats {
    pub products_scraped: u64,
    pub deals_found: u64,
    pub messages_sent: u64,
    pub errors_count: u64,
    pub cycles_completed: u64,
    pub last_run_time: Option<DateTime<Utc>>,
}

impl SessionStats {
    /// Fold one completed cycle into the session totals.
    pub fn absorb(&mut self, cycle: &CycleMetrics, completed_at: DateTime<Utc>) {
        self.products_scraped += cycle.products_scraped as u64;
        self.deals_found += cycle.deals_found as u64;
        self.messages_sent += cycle.messages_sent as u64;
        self.errors_count += cycle.errors as u64;
        self.cycles_completed += 1;
        self.last_run_time = Some(completed_at);
    }
}
