//! Padded atomic sequence counters.
//!
//! A `Sequence` is a monotonically non-decreasing 64-bit counter naming a
//! position in the event stream. The cursor, the claim cursor, and every
//! consumer's progress marker are all `Sequence` values. The release-on-set /
//! acquire-on-get pairing is the happens-before edge that makes slot writes
//! visible to readers once the cursor passes them.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::constants::CACHE_LINE_SIZE;

/// Starting value for every sequence: nothing published yet.
pub const INITIAL_SEQUENCE: i64 = -1;

const PADDING: usize = 2 * CACHE_LINE_SIZE - std::mem::size_of::<AtomicI64>();

/// Cache-line padded atomic sequence to prevent false sharing.
///
/// Alignment and size of 128 bytes keep neighbouring data off the line the
/// counter occupies. Hot counters (cursor, claim cursor, consumer progress)
/// are each written by different threads at high rates, so sharing a line
/// between any two of them would turn every publish into a coherence miss.
#[repr(align(128))]
pub struct Sequence {
    value: AtomicI64,
    _padding: [u8; PADDING],
}

impl Sequence {
    /// Create a sequence with the given initial value
    pub fn new(initial: i64) -> Self {
        Self {
            value: AtomicI64::new(initial),
            _padding: [0; PADDING],
        }
    }

    /// Read the current value (Acquire)
    #[inline(always)]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    /// Write a new value (Release)
    #[inline(always)]
    pub fn set(&self, new_value: i64) {
        self.value.store(new_value, Ordering::Release);
    }

    /// Atomically replace `expected` with `new_value`; true on success
    #[inline(always)]
    pub fn compare_and_set(&self, expected: i64, new_value: i64) -> bool {
        self.value
            .compare_exchange(expected, new_value, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Atomically add one and return the new value
    #[inline(always)]
    pub fn increment_and_get(&self) -> i64 {
        self.add_and_get(1)
    }

    /// Atomically add `n` and return the new value
    #[inline(always)]
    pub fn add_and_get(&self, n: i64) -> i64 {
        self.value.fetch_add(n, Ordering::AcqRel) + n
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new(INITIAL_SEQUENCE)
    }
}

impl std::fmt::Debug for Sequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Sequence").field(&self.get()).finish()
    }
}

/// Minimum value across a set of sequences, `i64::MAX` for an empty set.
///
/// An empty gating set therefore never blocks a producer; whether that is
/// permitted at all is decided by [`RingConfig::allow_ungated`].
///
/// [`RingConfig::allow_ungated`]: crate::RingConfig::allow_ungated
#[inline]
pub fn minimum_sequence(sequences: &[Arc<Sequence>]) -> i64 {
    let mut minimum = i64::MAX;
    for sequence in sequences {
        let value = sequence.get();
        if value < minimum {
            minimum = value;
        }
    }
    minimum
}
