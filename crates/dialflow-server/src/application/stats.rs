//! Dispatch statistics
//!
//! Lock-free counters shared by the dispatcher, recorder and sweeper. Readers
//! only ever see an immutable snapshot.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dialflow::CallOutcome;
use serde::Serialize;

#[derive(Debug, Default)]
pub struct DispatchStats {
    enqueued: AtomicU64,
    dispatched: AtomicU64,
    dnd_rejected: AtomicU64,
    placed: AtomicU64,
    dial_failures: AtomicU64,
    retries: AtomicU64,
    stale_reaped: AtomicU64,
    finalized: AtomicU64,
    outcomes: DashMap<CallOutcome, u64>,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatsSnapshot {
    pub enqueued: u64,
    pub dispatched: u64,
    pub dnd_rejected: u64,
    pub placed: u64,
    pub dial_failures: u64,
    pub retries: u64,
    pub stale_reaped: u64,
    pub finalized: u64,
    pub failed: u64,
    pub outcomes: BTreeMap<String, u64>,
    /// Share of finalized attempts whose outcome is `failed`
    pub failure_rate: f64,
}

impl DispatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dnd_rejected(&self) {
        self.dnd_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_placed(&self) {
        self.placed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dial_failure(&self) {
        self.dial_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_reaped(&self) {
        self.stale_reaped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_outcome(&self, outcome: CallOutcome) {
        self.finalized.fetch_add(1, Ordering::Relaxed);
        *self.outcomes.entry(outcome).or_insert(0) += 1;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let outcomes: BTreeMap<String, u64> = self
            .outcomes
            .iter()
            .map(|entry| (entry.key().to_string(), *entry.value()))
            .collect();
        let finalized = self.finalized.load(Ordering::Relaxed);
        let failed = self
            .outcomes
            .get(&CallOutcome::Failed)
            .map(|v| *v)
            .unwrap_or(0);
        let failure_rate = if finalized == 0 {
            0.0
        } else {
            failed as f64 / finalized as f64
        };

        StatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            dnd_rejected: self.dnd_rejected.load(Ordering::Relaxed),
            placed: self.placed.load(Ordering::Relaxed),
            dial_failures: self.dial_failures.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            stale_reaped: self.stale_reaped.load(Ordering::Relaxed),
            finalized,
            failed,
            outcomes,
            failure_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_rate() {
        let stats = DispatchStats::new();
        assert_eq!(stats.snapshot().failure_rate, 0.0);

        stats.record_outcome(CallOutcome::Failed);
        stats.record_outcome(CallOutcome::Appointment);
        stats.record_outcome(CallOutcome::Failed);
        stats.record_outcome(CallOutcome::NoAnswer);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.finalized, 4);
        assert_eq!(snapshot.failed, 2);
        assert_eq!(snapshot.failure_rate, 0.5);
        assert_eq!(snapshot.outcomes.get("failed"), Some(&2));
        assert_eq!(snapshot.outcomes.get("appointment"), Some(&1));
    }
}
