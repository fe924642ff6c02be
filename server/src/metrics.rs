use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct ClockMetrics {
    ticks: AtomicU64,
    rounds_advanced: AtomicU64,
    manual_resets: AtomicU64,
    force_sets: AtomicU64,
    persist_failures: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ClockMetricsSnapshot {
    pub ticks: u64,
    pub rounds_advanced: u64,
    pub manual_resets: u64,
    pub force_sets: u64,
    pub persist_failures: u64,
}

impl ClockMetrics {
    pub fn snapshot(&self) -> ClockMetricsSnapshot {
        ClockMetricsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            rounds_advanced: self.rounds_advanced.load(Ordering::Relaxed),
            manual_resets: self.manual_resets.load(Ordering::Relaxed),
            force_sets: self.force_sets.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
        }
    }

    pub fn inc_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_round_advanced(&self) {
        self.rounds_advanced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_manual_reset(&self) {
        self.manual_resets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_force_set(&self) {
        self.force_sets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_persist_failure(&self) {
        self.persist_failures.fetch_add(1, Ordering::Relaxed);
    }
}
