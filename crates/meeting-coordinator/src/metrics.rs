//! Coordinator counters.
//!
//! Plain atomics shared between the coordinator actor and its executor
//! task. Accessors exist for tests and for the embedding application's own
//! reporting; there is no exporter at this layer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared coordinator metrics.
#[derive(Debug, Default)]
pub struct CoordinatorMetrics {
    /// Roster reconciliation passes run.
    reconciliations: AtomicU64,
    /// Record change notifications observed.
    record_changes: AtomicU64,
    /// Delegated actions processed to a terminal status.
    actions_processed: AtomicU64,
    /// Delegated actions that ended in `Error`.
    actions_failed: AtomicU64,
    /// Duplicate action deliveries suppressed by the processed-id set.
    duplicates_suppressed: AtomicU64,
    /// Local engine toggles issued by the whiteboard synchronizer.
    whiteboard_toggles: AtomicU64,
}

impl CoordinatorMetrics {
    /// Create new shared metrics.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_reconciliation(&self) {
        self.reconciliations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_record_change(&self) {
        self.record_changes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_action_processed(&self) {
        self.actions_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_action_failed(&self) {
        self.actions_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate_suppressed(&self) {
        self.duplicates_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_whiteboard_toggle(&self) {
        self.whiteboard_toggles.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn reconciliations(&self) -> u64 {
        self.reconciliations.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn record_changes(&self) -> u64 {
        self.record_changes.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn actions_processed(&self) -> u64 {
        self.actions_processed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn actions_failed(&self) -> u64 {
        self.actions_failed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn duplicates_suppressed(&self) -> u64 {
        self.duplicates_suppressed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn whiteboard_toggles(&self) -> u64 {
        self.whiteboard_toggles.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_increment_independently() {
        let metrics = CoordinatorMetrics::new();

        metrics.record_reconciliation();
        metrics.record_reconciliation();
        metrics.record_action_processed();
        metrics.record_duplicate_suppressed();

        assert_eq!(metrics.reconciliations(), 2);
        assert_eq!(metrics.actions_processed(), 1);
        assert_eq!(metrics.duplicates_suppressed(), 1);
        assert_eq!(metrics.actions_failed(), 0);
        assert_eq!(metrics.whiteboard_toggles(), 0);
    }
}
