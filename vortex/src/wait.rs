//! Wait strategies for ring consumers
//!
//! A wait strategy controls how a thread waits for the cursor to reach a
//! requested sequence. Each strategy offers a different trade-off between
//! latency, CPU usage, and throughput. Every strategy re-checks the alert
//! flag on each iteration so a cancel request is observed within bounded
//! time regardless of cursor progress.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::constants::{SPIN_TRIES, YIELD_TRIES};
use crate::error::{Result, VortexError};
use crate::sequence::Sequence;

/// Trait for wait strategies that determine how consumers wait for a sequence.
///
/// Custom implementations are a supported extension point; the four built-in
/// strategies cover the common latency/CPU trade-offs.
pub trait WaitStrategy: Send + Sync {
    /// Wait until `cursor` reaches `sequence`.
    ///
    /// Returns the observed cursor value, which is `>= sequence`. Returns
    /// [`VortexError::Alert`] as soon as the alert flag is observed set.
    fn wait_for(&self, sequence: i64, cursor: &Sequence, alert: &AtomicBool) -> Result<i64>;

    /// Wait like [`wait_for`](Self::wait_for), giving up after `timeout`.
    ///
    /// Returns [`VortexError::Timeout`] once the deadline passes without the
    /// cursor reaching `sequence`; callers re-check and decide whether to
    /// retry.
    fn wait_for_timeout(
        &self,
        sequence: i64,
        cursor: &Sequence,
        alert: &AtomicBool,
        timeout: Duration,
    ) -> Result<i64>;

    /// Wake any threads blocked inside [`wait_for`](Self::wait_for).
    ///
    /// Called by the publish path after the cursor advances and by
    /// [`alert`](crate::barrier::SequenceBarrier::alert). Must be a no-op
    /// for strategies that never block.
    fn signal_all_when_blocking(&self);
}

#[inline(always)]
fn check_alert(alert: &AtomicBool) -> Result<()> {
    if alert.load(Ordering::Acquire) {
        return Err(VortexError::Alert);
    }
    Ok(())
}

/// Busy spin wait strategy - lowest latency, highest CPU usage.
///
/// Continuously re-reads the cursor in a tight loop. Ideal when latency is
/// critical and a core can be dedicated to the consumer; burns 100% of that
/// core while waiting.
pub struct BusySpinWaitStrategy;

impl BusySpinWaitStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BusySpinWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for BusySpinWaitStrategy {
    fn wait_for(&self, sequence: i64, cursor: &Sequence, alert: &AtomicBool) -> Result<i64> {
        loop {
            check_alert(alert)?;
            let available = cursor.get();
            if available >= sequence {
                return Ok(available);
            }
            std::hint::spin_loop();
        }
    }

    fn wait_for_timeout(
        &self,
        sequence: i64,
        cursor: &Sequence,
        alert: &AtomicBool,
        timeout: Duration,
    ) -> Result<i64> {
        let deadline = Instant::now() + timeout;
        loop {
            check_alert(alert)?;
            let available = cursor.get();
            if available >= sequence {
                return Ok(available);
            }
            if Instant::now() >= deadline {
                return Err(VortexError::Timeout);
            }
            std::hint::spin_loop();
        }
    }

    fn signal_all_when_blocking(&self) {
        // No blocked threads to wake
    }
}

/// Yielding wait strategy - moderate CPU usage and latency.
///
/// Spins a bounded number of times, then yields the core between re-reads.
/// A good compromise when consumer threads share cores with other work.
pub struct YieldingWaitStrategy {
    spin_tries: u32,
}

impl YieldingWaitStrategy {
    pub fn new() -> Self {
        Self {
            spin_tries: SPIN_TRIES,
        }
    }

    /// Custom number of tight-spin iterations before yielding begins
    pub fn with_spin_tries(spin_tries: u32) -> Self {
        Self { spin_tries }
    }

    #[inline(always)]
    fn pause(&self, counter: &mut u32) {
        if *counter < self.spin_tries {
            std::hint::spin_loop();
        } else {
            thread::yield_now();
        }
        *counter = counter.wrapping_add(1);
    }
}

impl Default for YieldingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for YieldingWaitStrategy {
    fn wait_for(&self, sequence: i64, cursor: &Sequence, alert: &AtomicBool) -> Result<i64> {
        let mut counter = 0u32;
        loop {
            check_alert(alert)?;
            let available = cursor.get();
            if available >= sequence {
                return Ok(available);
            }
            self.pause(&mut counter);
        }
    }

    fn wait_for_timeout(
        &self,
        sequence: i64,
        cursor: &Sequence,
        alert: &AtomicBool,
        timeout: Duration,
    ) -> Result<i64> {
        let deadline = Instant::now() + timeout;
        let mut counter = 0u32;
        loop {
            check_alert(alert)?;
            let available = cursor.get();
            if available >= sequence {
                return Ok(available);
            }
            if Instant::now() >= deadline {
                return Err(VortexError::Timeout);
            }
            self.pause(&mut counter);
        }
    }

    fn signal_all_when_blocking(&self) {
        // No blocked threads to wake
    }
}

/// Sleeping wait strategy - lowest CPU usage, higher latency.
///
/// Spins, then yields, then parks with a doubling backoff up to
/// `max_park_nanos`. Suited to background consumers where wake latency in
/// the tens of microseconds is acceptable.
pub struct SleepingWaitStrategy {
    spin_tries: u32,
    yield_tries: u32,
    max_park_nanos: u64,
}

impl SleepingWaitStrategy {
    pub fn new() -> Self {
        Self {
            spin_tries: SPIN_TRIES,
            yield_tries: YIELD_TRIES,
            max_park_nanos: 1_000_000,
        }
    }

    /// Custom phase lengths and park ceiling
    pub fn with_tuning(spin_tries: u32, yield_tries: u32, max_park_nanos: u64) -> Self {
        Self {
            spin_tries,
            yield_tries,
            max_park_nanos: max_park_nanos.max(1),
        }
    }

    #[inline(always)]
    fn pause(&self, counter: &mut u32, park_nanos: &mut u64) {
        let i = *counter;
        if i < self.spin_tries {
            std::hint::spin_loop();
        } else if i < self.spin_tries + self.yield_tries {
            thread::yield_now();
        } else {
            thread::sleep(Duration::from_nanos(*park_nanos));
            *park_nanos = (*park_nanos * 2).min(self.max_park_nanos);
        }
        *counter = counter.wrapping_add(1);
    }
}

impl Default for SleepingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for SleepingWaitStrategy {
    fn wait_for(&self, sequence: i64, cursor: &Sequence, alert: &AtomicBool) -> Result<i64> {
        let mut counter = 0u32;
        let mut park_nanos = 1u64;
        loop {
            check_alert(alert)?;
            let available = cursor.get();
            if available >= sequence {
                return Ok(available);
            }
            self.pause(&mut counter, &mut park_nanos);
        }
    }

    fn wait_for_timeout(
        &self,
        sequence: i64,
        cursor: &Sequence,
        alert: &AtomicBool,
        timeout: Duration,
    ) -> Result<i64> {
        let deadline = Instant::now() + timeout;
        let mut counter = 0u32;
        let mut park_nanos = 1u64;
        loop {
            check_alert(alert)?;
            let available = cursor.get();
            if available >= sequence {
                return Ok(available);
            }
            if Instant::now() >= deadline {
                return Err(VortexError::Timeout);
            }
            self.pause(&mut counter, &mut park_nanos);
        }
    }

    fn signal_all_when_blocking(&self) {
        // Parked threads wake on their own schedule
    }
}

/// Blocking wait strategy - balanced latency and CPU usage.
///
/// Blocks the consumer on a condition variable until the publish path
/// signals progress. The only strategy whose signal is not a no-op; the
/// lock is held only around the sleep/wake handshake, never across slot
/// access.
pub struct BlockingWaitStrategy {
    mutex: parking_lot::Mutex<()>,
    condvar: parking_lot::Condvar,
}

impl BlockingWaitStrategy {
    pub fn new() -> Self {
        Self {
            mutex: parking_lot::Mutex::new(()),
            condvar: parking_lot::Condvar::new(),
        }
    }
}

impl Default for BlockingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for BlockingWaitStrategy {
    fn wait_for(&self, sequence: i64, cursor: &Sequence, alert: &AtomicBool) -> Result<i64> {
        let available = cursor.get();
        if available >= sequence {
            return Ok(available);
        }

        let mut guard = self.mutex.lock();
        loop {
            check_alert(alert)?;
            // Re-read under the lock: a publish that ran before we locked is
            // visible here, one that runs after will signal us.
            let available = cursor.get();
            if available >= sequence {
                return Ok(available);
            }
            self.condvar.wait(&mut guard);
        }
    }

    fn wait_for_timeout(
        &self,
        sequence: i64,
        cursor: &Sequence,
        alert: &AtomicBool,
        timeout: Duration,
    ) -> Result<i64> {
        let deadline = Instant::now() + timeout;

        let available = cursor.get();
        if available >= sequence {
            return Ok(available);
        }

        let mut guard = self.mutex.lock();
        loop {
            check_alert(alert)?;
            let available = cursor.get();
            if available >= sequence {
                return Ok(available);
            }
            if self.condvar.wait_until(&mut guard, deadline).timed_out() {
                check_alert(alert)?;
                let available = cursor.get();
                if available >= sequence {
                    return Ok(available);
                }
                return Err(VortexError::Timeout);
            }
        }
    }

    fn signal_all_when_blocking(&self) {
        // Taking the lock pairs the notify with the waiter's re-check,
        // closing the missed-wakeup window.
        let _guard = self.mutex.lock();
        self.condvar.notify_all();
    }
}
