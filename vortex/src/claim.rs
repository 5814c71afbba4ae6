//! Slot-claim strategies for producers.
//!
//! Two variants, selected at construction: a single-producer counter with no
//! atomics on the claim path, and a multi-producer atomic counter. Both
//! enforce the wrap rule: sequence `s` may be claimed only once
//! `s - capacity <= min(gating)`, so no slot still referenced by a gating
//! consumer is ever overwritten.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::constants::{PARK_NANOS, SPIN_TRIES, YIELD_TRIES};
use crate::error::{Result, VortexError};
use crate::insights;
use crate::sequence::{minimum_sequence, Sequence, INITIAL_SEQUENCE};

/// Staged backoff for capacity spins: tight spin, then yield, then a short
/// park. Keeps latency low for brief stalls without starving other threads
/// when a consumer is genuinely slow.
#[inline]
pub(crate) fn spin_backoff(iteration: &mut u32) {
    let i = *iteration;
    if i < SPIN_TRIES {
        std::hint::spin_loop();
    } else if i < SPIN_TRIES + YIELD_TRIES {
        thread::yield_now();
    } else {
        thread::sleep(Duration::from_nanos(PARK_NANOS));
    }
    *iteration = iteration.wrapping_add(1);
}

/// Claim counter for exactly one producer thread.
///
/// Plain `Cell` state: with a single claimant there is nothing to race on,
/// and the cached gating minimum means the gating set is only scanned when
/// the cache says the ring might be full.
pub struct SingleProducerClaim {
    next: Cell<i64>,
    cached_gate: Cell<i64>,
}

/// Claim counter shared by any number of producer threads.
pub struct MultiProducerClaim {
    claim: Sequence,
}

/// Producer-side claim coordination, one of two closed variants.
pub enum ClaimStrategy {
    Single(SingleProducerClaim),
    Multi(MultiProducerClaim),
}

// SAFETY: the Single variant's Cells are only ever touched by the one
// producer thread the variant is documented for; the Multi variant is
// atomic throughout. Sharing the enum across threads is sound under that
// producer contract.
unsafe impl Send for ClaimStrategy {}
unsafe impl Sync for ClaimStrategy {}

impl ClaimStrategy {
    pub fn single_producer() -> Self {
        Self::Single(SingleProducerClaim {
            next: Cell::new(INITIAL_SEQUENCE),
            cached_gate: Cell::new(INITIAL_SEQUENCE),
        })
    }

    pub fn multi_producer() -> Self {
        Self::Multi(MultiProducerClaim {
            claim: Sequence::default(),
        })
    }

    /// Highest sequence handed out so far
    #[inline]
    pub fn current(&self) -> i64 {
        match self {
            Self::Single(s) => s.next.get(),
            Self::Multi(m) => m.claim.get(),
        }
    }

    /// Advance the claim counter by `n` and return the new highest claim
    #[inline]
    pub fn increment_and_get(&self, n: i64) -> i64 {
        match self {
            Self::Single(s) => {
                let next = s.next.get() + n;
                s.next.set(next);
                next
            }
            Self::Multi(m) => m.claim.add_and_get(n),
        }
    }

    /// Reset the claim counter to `sequence` (external resynchronization)
    #[inline]
    pub fn set_current(&self, sequence: i64) {
        match self {
            Self::Single(s) => s.next.set(sequence),
            Self::Multi(m) => m.claim.set(sequence),
        }
    }

    /// Block until claiming up to `sequence` cannot overrun any gating
    /// consumer, i.e. `sequence - capacity <= min(gating)`.
    ///
    /// Spins with staged backoff and returns [`VortexError::Alert`] if the
    /// sequencer's alert flag is raised while waiting.
    pub fn ensure_available(
        &self,
        sequence: i64,
        gating: &[Arc<Sequence>],
        capacity: i64,
        alert: &AtomicBool,
    ) -> Result<()> {
        let wrap_point = sequence - capacity;

        if let Self::Single(s) = self {
            if wrap_point <= s.cached_gate.get() {
                return Ok(());
            }
        }

        let minimum = minimum_sequence(gating);
        if wrap_point <= minimum {
            if let Self::Single(s) = self {
                s.cached_gate.set(minimum);
            }
            return Ok(());
        }

        insights::record_backpressure(sequence);
        let mut iteration = 0u32;
        loop {
            if alert.load(Ordering::Acquire) {
                return Err(VortexError::Alert);
            }
            let minimum = minimum_sequence(gating);
            if wrap_point <= minimum {
                if let Self::Single(s) = self {
                    s.cached_gate.set(minimum);
                }
                return Ok(());
            }
            spin_backoff(&mut iteration);
        }
    }

    /// Claim `n` sequences only if room exists right now.
    ///
    /// Returns the new highest claim, or [`VortexError::InsufficientCapacity`]
    /// with no side effects.
    pub fn try_claim(&self, n: i64, gating: &[Arc<Sequence>], capacity: i64) -> Result<i64> {
        match self {
            Self::Single(s) => {
                let next = s.next.get() + n;
                let wrap_point = next - capacity;
                if wrap_point > s.cached_gate.get() {
                    let minimum = minimum_sequence(gating);
                    if wrap_point > minimum {
                        return Err(VortexError::InsufficientCapacity);
                    }
                    s.cached_gate.set(minimum);
                }
                s.next.set(next);
                Ok(next)
            }
            Self::Multi(m) => loop {
                let current = m.claim.get();
                let next = current + n;
                if next - capacity > minimum_sequence(gating) {
                    return Err(VortexError::InsufficientCapacity);
                }
                if m.claim.compare_and_set(current, next) {
                    return Ok(next);
                }
                std::hint::spin_loop();
            },
        }
    }

    pub fn is_single_producer(&self) -> bool {
        matches!(self, Self::Single(_))
    }
}
