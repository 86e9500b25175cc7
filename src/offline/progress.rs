//! Progress accounting for an offline mirroring run

use std::sync::atomic::{AtomicUsize, Ordering};

/// What a progress notification should currently display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationState {
    Idle,
    InProgress { current: usize, total: usize },
    /// `completed < total` means some units failed
    Complete { completed: usize, total: usize },
}

impl NotificationState {
    /// Move to the in-progress state for a fresh run
    pub fn start(total: usize) -> Self {
        Self::InProgress { current: 0, total }
    }

    /// Refresh the displayed count; ignored outside a run
    pub fn advance(self, current: usize) -> Self {
        match self {
            Self::InProgress { total, .. } => Self::InProgress {
                current: current.min(total),
                total,
            },
            other => other,
        }
    }

    /// Close the run with the final count
    pub fn finish(self, completed: usize) -> Self {
        match self {
            Self::InProgress { total, .. } => Self::Complete {
                completed: completed.min(total),
                total,
            },
            other => other,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    /// The user may dismiss the notification only once the run is over
    pub fn can_dismiss(&self) -> bool {
        !matches!(self, Self::InProgress { .. })
    }

    /// Fraction done in `0.0..=1.0`
    pub fn fraction(&self) -> f64 {
        match *self {
            Self::Idle => 0.0,
            Self::InProgress { current, total } | Self::Complete { completed: current, total } => {
                if total == 0 {
                    1.0
                } else {
                    current as f64 / total as f64
                }
            }
        }
    }
}

/// Counters for one offline-enable run
///
/// `completed` only ever grows during a run and never passes `total`.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    completed: AtomicUsize,
    failed: AtomicUsize,
    total: AtomicUsize,
}

/// A point-in-time copy of the tracker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero the counters and fix the total for a new run
    pub fn reset(&self, total: usize) {
        self.completed.store(0, Ordering::SeqCst);
        self.failed.store(0, Ordering::SeqCst);
        self.total.store(total, Ordering::SeqCst);
    }

    /// Count one successful unit; returns the new completed count
    pub fn record_success(&self) -> usize {
        let total = self.total.load(Ordering::SeqCst);
        match self
            .completed
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < total).then_some(n + 1)
            }) {
            Ok(previous) => previous + 1,
            Err(current) => current,
        }
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            completed: self.completed.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            total: self.total.load(Ordering::SeqCst),
        }
    }

    /// Fraction done, for UI timers; reads the same as the notification
    pub fn fraction(&self) -> f64 {
        let snapshot = self.snapshot();
        NotificationState::start(snapshot.total)
            .advance(snapshot.completed)
            .fraction()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_success_never_exceeds_total() {
        let tracker = ProgressTracker::new();
        tracker.reset(2);
        assert_eq!(tracker.record_success(), 1);
        assert_eq!(tracker.record_success(), 2);
        assert_eq!(tracker.record_success(), 2);
        assert_eq!(tracker.completed(), 2);
    }

    #[test]
    fn test_reset_clears_counts() {
        let tracker = ProgressTracker::new();
        tracker.reset(3);
        tracker.record_success();
        tracker.record_failure();
        tracker.reset(5);
        assert_eq!(
            tracker.snapshot(),
            ProgressSnapshot {
                completed: 0,
                failed: 0,
                total: 5
            }
        );
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_monotonic() {
        let tracker = Arc::new(ProgressTracker::new());
        tracker.reset(50);

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let tracker = tracker.clone();
                tokio::spawn(async move { tracker.record_success() })
            })
            .collect();

        let mut last = 0;
        for handle in handles {
            let value = handle.await.unwrap();
            assert!(value <= 50);
            last = last.max(value);
        }
        assert_eq!(last, 50);
        assert_eq!(tracker.completed(), 50);
    }

    #[test]
    fn test_state_machine_transitions() {
        let state = NotificationState::start(4);
        assert!(!state.can_dismiss());

        let state = state.advance(2);
        assert_eq!(state, NotificationState::InProgress { current: 2, total: 4 });
        assert_eq!(state.fraction(), 0.5);

        let state = state.finish(4);
        assert!(state.is_complete());
        assert!(state.can_dismiss());

        // Finished runs ignore further updates
        assert_eq!(state.advance(1), state);
        assert_eq!(NotificationState::Idle.finish(3), NotificationState::Idle);
    }

    #[test]
    fn test_empty_run_is_fully_done() {
        assert_eq!(NotificationState::start(0).fraction(), 1.0);
        assert_eq!(NotificationState::start(3).advance(9).fraction(), 1.0);

        let tracker = ProgressTracker::new();
        assert_eq!(tracker.fraction(), 1.0);
    }

    #[test]
    fn test_tracker_fraction_matches_notification() {
        let tracker = ProgressTracker::new();
        tracker.reset(4);
        tracker.record_success();
        let state = NotificationState::start(4).advance(tracker.completed());
        assert_eq!(tracker.fraction(), 0.25);
        assert_eq!(tracker.fraction(), state.fraction());
    }
}
