//! Sequence barrier: a consumer's view over the cursor and its upstream
//! dependencies.
//!
//! A barrier answers "what is the highest sequence I may safely read?",
//! which is `min(cursor, min(dependency sequences))`. The cursor wait is
//! delegated to the wait strategy; the dependency wait is always an
//! alert-checking spin, because dependencies advance from other consumer
//! threads that signal through the same strategy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, VortexError};
use crate::insights;
use crate::sequence::{minimum_sequence, Sequence};
use crate::wait::WaitStrategy;

/// Barrier a consumer waits on for sequence progress.
///
/// Created by [`Sequencer::new_barrier`](crate::sequencer::Sequencer::new_barrier)
/// with the dependency sequences of the stages this consumer must run
/// behind (empty for first-stage consumers). The alert latch is sticky:
/// once raised it fails every wait until [`clear_alert`](Self::clear_alert).
pub struct SequenceBarrier {
    wait_strategy: Arc<dyn WaitStrategy>,
    cursor: Arc<Sequence>,
    dependencies: Box<[Arc<Sequence>]>,
    alerted: AtomicBool,
}

impl SequenceBarrier {
    pub(crate) fn new(
        wait_strategy: Arc<dyn WaitStrategy>,
        cursor: Arc<Sequence>,
        dependencies: Vec<Arc<Sequence>>,
    ) -> Self {
        Self {
            wait_strategy,
            cursor,
            dependencies: dependencies.into_boxed_slice(),
            alerted: AtomicBool::new(false),
        }
    }

    /// Wait until `sequence` is safe to read.
    ///
    /// Returns the highest currently-safe sequence, which is `>= sequence`
    /// and equals `min(cursor, min(dependencies))` when dependencies exist.
    /// Returns [`VortexError::Alert`] within bounded time of
    /// [`alert`](Self::alert) being called.
    pub fn wait_for(&self, sequence: i64) -> Result<i64> {
        self.check_alert()?;
        let available = self
            .wait_strategy
            .wait_for(sequence, &self.cursor, &self.alerted)?;

        if self.dependencies.is_empty() {
            return Ok(available);
        }

        loop {
            self.check_alert()?;
            let dependency_minimum = minimum_sequence(&self.dependencies);
            if dependency_minimum >= sequence {
                return Ok(dependency_minimum.min(available));
            }
            std::hint::spin_loop();
        }
    }

    /// Like [`wait_for`](Self::wait_for) with a deadline.
    ///
    /// Returns [`VortexError::Timeout`] once `timeout` elapses; the caller
    /// re-checks and may retry or re-queue.
    pub fn wait_for_timeout(&self, sequence: i64, timeout: Duration) -> Result<i64> {
        let deadline = std::time::Instant::now() + timeout;

        self.check_alert()?;
        let available =
            self.wait_strategy
                .wait_for_timeout(sequence, &self.cursor, &self.alerted, timeout)?;

        if self.dependencies.is_empty() {
            return Ok(available);
        }

        loop {
            self.check_alert()?;
            let dependency_minimum = minimum_sequence(&self.dependencies);
            if dependency_minimum >= sequence {
                return Ok(dependency_minimum.min(available));
            }
            if std::time::Instant::now() >= deadline {
                return Err(VortexError::Timeout);
            }
            std::hint::spin_loop();
        }
    }

    /// Raise the alert latch and wake any blocked waiter. Idempotent.
    pub fn alert(&self) {
        insights::record_alert();
        self.alerted.store(true, Ordering::Release);
        self.wait_strategy.signal_all_when_blocking();
    }

    /// Lower the alert latch so waits may resume.
    pub fn clear_alert(&self) {
        self.alerted.store(false, Ordering::Release);
    }

    /// Fail with [`VortexError::Alert`] if the latch is raised.
    #[inline]
    pub fn check_alert(&self) -> Result<()> {
        if self.is_alerted() {
            return Err(VortexError::Alert);
        }
        Ok(())
    }

    #[inline]
    pub fn is_alerted(&self) -> bool {
        self.alerted.load(Ordering::Acquire)
    }

    /// Current cursor value (highest published sequence)
    #[inline]
    pub fn cursor(&self) -> i64 {
        self.cursor.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wait::BusySpinWaitStrategy;
    use std::thread;

    fn barrier_with(
        cursor_value: i64,
        dependency_values: &[i64],
    ) -> (SequenceBarrier, Vec<Arc<Sequence>>) {
        let cursor = Arc::new(Sequence::new(cursor_value));
        let dependencies: Vec<Arc<Sequence>> = dependency_values
            .iter()
            .map(|&v| Arc::new(Sequence::new(v)))
            .collect();
        let barrier = SequenceBarrier::new(
            Arc::new(BusySpinWaitStrategy::new()),
            cursor,
            dependencies.clone(),
        );
        (barrier, dependencies)
    }

    #[test]
    fn test_available_sequence_is_minimum_of_dependencies() {
        // Producer has published far ahead; the slowest dependency gates
        let (barrier, _deps) = barrier_with(2_384_378, &[3, 86, 2_384_378]);
        assert_eq!(barrier.wait_for(3).unwrap(), 3);
    }

    #[test]
    fn test_wait_where_dependencies_are_ahead() {
        let (barrier, _deps) = barrier_with(9, &[10, 9, 9]);
        let available = barrier.wait_for(9).unwrap();
        assert!(available >= 9);
    }

    #[test]
    fn test_no_dependencies_tracks_cursor_only() {
        let (barrier, _deps) = barrier_with(7, &[]);
        assert_eq!(barrier.wait_for(5).unwrap(), 7);
    }

    #[test]
    fn test_alert_unblocks_dependency_spin() {
        let (barrier, deps) = barrier_with(9, &[8, 8, 8]);
        let barrier = Arc::new(barrier);

        let waiter_barrier = barrier.clone();
        let waiter = thread::spawn(move || waiter_barrier.wait_for(9));

        thread::sleep(Duration::from_millis(10));
        barrier.alert();
        let result = waiter.join().unwrap();
        assert!(matches!(result, Err(VortexError::Alert)));
        // No dependency advanced while the waiter was cancelled
        assert!(deps.iter().all(|d| d.get() == 8));
    }

    #[test]
    fn test_dependent_progress_unblocks() {
        let (barrier, deps) = barrier_with(9, &[8, 8, 8]);

        let movers = deps.clone();
        let advancer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            for dep in &movers {
                dep.set(9);
            }
        });

        let available = barrier.wait_for(9).unwrap();
        assert!(available >= 9);
        assert!(!barrier.is_alerted());
        advancer.join().unwrap();
    }

    #[test]
    fn test_alert_is_sticky_until_cleared() {
        let (barrier, _deps) = barrier_with(10, &[]);
        barrier.alert();
        assert!(barrier.is_alerted());
        assert!(matches!(barrier.wait_for(0), Err(VortexError::Alert)));
        // Still latched after a failed wait
        assert!(matches!(barrier.wait_for(0), Err(VortexError::Alert)));

        barrier.clear_alert();
        assert!(!barrier.is_alerted());
        assert_eq!(barrier.wait_for(0).unwrap(), 10);
    }

    #[test]
    fn test_timeout_while_dependency_lags() {
        let (barrier, _deps) = barrier_with(9, &[8]);
        let result = barrier.wait_for_timeout(9, Duration::from_millis(5));
        assert!(matches!(result, Err(VortexError::Timeout)));
    }

    #[test]
    fn test_cursor_accessor() {
        let (barrier, _deps) = barrier_with(17, &[]);
        assert_eq!(barrier.cursor(), 17);
    }
}
