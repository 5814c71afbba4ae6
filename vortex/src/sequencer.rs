//! Sequence claiming and the publish protocol.
//!
//! The sequencer owns the cursor (highest fully-published sequence), the
//! claim strategy, and the gating set. Producers claim through it, write
//! their slots, then publish back through it; the cursor only ever advances
//! over sequences whose writes are complete, which is the visibility
//! guarantee every consumer relies on.
//!
//! Multi-producer publishes may finish out of claim order. An availability
//! table records the round of the sequence most recently published into each
//! ring position, and the cursor is advanced to the highest sequence with no
//! unpublished predecessor. Single-producer publish is a plain release
//! store.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::barrier::SequenceBarrier;
use crate::batch::SequenceBatch;
use crate::claim::ClaimStrategy;
use crate::error::{Result, VortexError};
use crate::insights;
use crate::sequence::Sequence;
use crate::wait::WaitStrategy;

/// Per-slot publication tracking for multi-producer rings.
///
/// Each entry stores `sequence >> index_shift` (the wrap round) of the
/// sequence last published into that ring position, so a slot published in
/// an earlier round is never mistaken for the current one.
struct Availability {
    buffer: Box<[AtomicI64]>,
    index_mask: usize,
    index_shift: u32,
}

impl Availability {
    fn new(capacity: usize) -> Self {
        debug_assert!(capacity.is_power_of_two());
        let buffer = (0..capacity)
            .map(|_| AtomicI64::new(-1))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            buffer,
            index_mask: capacity - 1,
            index_shift: capacity.trailing_zeros(),
        }
    }

    #[inline(always)]
    fn round(&self, sequence: i64) -> i64 {
        sequence >> self.index_shift
    }

    #[inline(always)]
    fn set(&self, sequence: i64) {
        let index = (sequence as usize) & self.index_mask;
        self.buffer[index].store(self.round(sequence), Ordering::Release);
    }

    #[inline(always)]
    fn is_set(&self, sequence: i64) -> bool {
        let index = (sequence as usize) & self.index_mask;
        self.buffer[index].load(Ordering::Acquire) == self.round(sequence)
    }

    /// Highest sequence in `[lower, upper]` with every predecessor in the
    /// range published; `lower - 1` when `lower` itself is unpublished.
    fn highest_published(&self, lower: i64, upper: i64) -> i64 {
        let mut sequence = lower;
        while sequence <= upper {
            if !self.is_set(sequence) {
                return sequence - 1;
            }
            sequence += 1;
        }
        upper
    }
}

/// Coordinator for claiming and publishing sequences over one ring.
pub struct Sequencer {
    cursor: Arc<Sequence>,
    claim: ClaimStrategy,
    wait_strategy: Arc<dyn WaitStrategy>,
    capacity: usize,
    gating: OnceLock<Box<[Arc<Sequence>]>>,
    claimed: AtomicBool,
    alert: AtomicBool,
    allow_ungated: bool,
    availability: Option<Availability>,
}

impl Sequencer {
    /// `capacity` must already be a power of two (the ring storage rounds).
    pub fn new(
        capacity: usize,
        claim: ClaimStrategy,
        wait_strategy: Arc<dyn WaitStrategy>,
        allow_ungated: bool,
    ) -> Self {
        debug_assert!(capacity.is_power_of_two());
        let availability = if claim.is_single_producer() {
            None
        } else {
            Some(Availability::new(capacity))
        };
        Self {
            cursor: Arc::new(Sequence::default()),
            claim,
            wait_strategy,
            capacity,
            gating: OnceLock::new(),
            claimed: AtomicBool::new(false),
            alert: AtomicBool::new(false),
            allow_ungated,
            availability,
        }
    }

    /// Claim the next sequence, blocking while gating leaves no room
    pub fn next(&self) -> Result<i64> {
        self.next_n(1)
    }

    /// Claim `n` contiguous sequences, blocking while gating leaves no room
    pub fn next_batch(&self, n: usize) -> Result<SequenceBatch> {
        if n == 0 || n > self.capacity {
            return Err(VortexError::config(format!(
                "batch size {} must be in 1..={}",
                n, self.capacity
            )));
        }
        let end = self.next_n(n as i64)?;
        Ok(SequenceBatch::new(end, n as i64))
    }

    /// Claim the next sequence only if room exists right now
    pub fn try_next(&self) -> Result<i64> {
        let gating = self.gating_for_claim()?;
        self.claim.try_claim(1, gating, self.capacity as i64)
    }

    fn next_n(&self, n: i64) -> Result<i64> {
        let gating = self.gating_for_claim()?;
        let sequence = self.claim.increment_and_get(n);
        self.claim
            .ensure_available(sequence, gating, self.capacity as i64, &self.alert)?;
        Ok(sequence)
    }

    /// Make `sequence` visible to consumers.
    ///
    /// Multi-producer rings hold the cursor back until every lower claimed
    /// sequence has also been published, preserving cursor monotonicity
    /// over complete prefixes only.
    pub fn publish(&self, sequence: i64) {
        match &self.availability {
            None => self.cursor.set(sequence),
            Some(availability) => {
                availability.set(sequence);
                self.advance_cursor(availability);
            }
        }
        self.wait_strategy.signal_all_when_blocking();
    }

    /// Publish every sequence of a claimed batch
    pub fn publish_batch(&self, batch: &SequenceBatch) {
        match &self.availability {
            None => self.cursor.set(batch.end()),
            Some(availability) => {
                for sequence in batch.sequences() {
                    availability.set(sequence);
                }
                self.advance_cursor(availability);
            }
        }
        self.wait_strategy.signal_all_when_blocking();
    }

    fn advance_cursor(&self, availability: &Availability) {
        loop {
            let current = self.cursor.get();
            let published = availability.highest_published(current + 1, self.claim.current());
            if published <= current {
                return;
            }
            if self.cursor.compare_and_set(current, published) {
                return;
            }
            // Lost the race to another publisher; re-read and retry
        }
    }

    /// Assert capacity for `sequence` without advancing the claim counter.
    ///
    /// Single-producer force path, paired with
    /// [`force_publish`](Self::force_publish) when sequencing is driven
    /// externally.
    pub fn claim(&self, sequence: i64) -> Result<()> {
        if !self.claim.is_single_producer() {
            return Err(VortexError::illegal_state(
                "explicit sequence claims require a single-producer ring",
            ));
        }
        let gating = self.gating_for_claim()?;
        self.claim
            .ensure_available(sequence, gating, self.capacity as i64, &self.alert)
    }

    /// Set both the claim counter and the cursor to `sequence`.
    ///
    /// Single-producer resynchronization after external sequencing; all
    /// sequences up to and including `sequence` become visible.
    pub fn force_publish(&self, sequence: i64) -> Result<()> {
        if !self.claim.is_single_producer() {
            return Err(VortexError::illegal_state(
                "force publish requires a single-producer ring",
            ));
        }
        self.claim.set_current(sequence);
        self.cursor.set(sequence);
        self.wait_strategy.signal_all_when_blocking();
        Ok(())
    }

    /// Create a barrier over the cursor and the given dependency sequences
    pub fn new_barrier(&self, dependencies: &[Arc<Sequence>]) -> SequenceBarrier {
        SequenceBarrier::new(
            self.wait_strategy.clone(),
            self.cursor.clone(),
            dependencies.to_vec(),
        )
    }

    /// Wire in the gating sequences that bound producer progress.
    ///
    /// Must be called exactly once, before the first claim; both a second
    /// call and a late call fail.
    pub fn add_gating_sequences(&self, sequences: &[Arc<Sequence>]) -> Result<()> {
        if self.claimed.load(Ordering::Acquire) {
            return Err(VortexError::illegal_state(
                "gating sequences must be configured before the first claim",
            ));
        }
        self.gating
            .set(sequences.to_vec().into_boxed_slice())
            .map_err(|_| VortexError::illegal_state("gating sequences already configured"))
    }

    fn gating_for_claim(&self) -> Result<&[Arc<Sequence>]> {
        if !self.claimed.load(Ordering::Relaxed) {
            self.claimed.store(true, Ordering::Release);
        }
        let gating = self.gating_slice();
        if gating.is_empty() && !self.allow_ungated {
            return Err(VortexError::illegal_state(
                "no gating sequences configured; enable allow_ungated to run unbounded",
            ));
        }
        Ok(gating)
    }

    #[inline]
    fn gating_slice(&self) -> &[Arc<Sequence>] {
        self.gating.get().map(|g| &g[..]).unwrap_or(&[])
    }

    /// Highest published sequence
    #[inline]
    pub fn cursor(&self) -> i64 {
        self.cursor.get()
    }

    /// Ring capacity in slots
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Cancel producers spinning on gating capacity.
    ///
    /// Distinct from each barrier's consumer-side latch; clearing a
    /// barrier never un-cancels a producer.
    pub fn alert(&self) {
        insights::record_alert();
        self.alert.store(true, Ordering::Release);
        self.wait_strategy.signal_all_when_blocking();
    }

    /// Lower the producer-side alert so claims may resume
    pub fn clear_alert(&self) {
        self.alert.store(false, Ordering::Release);
    }

    pub fn is_alerted(&self) -> bool {
        self.alert.load(Ordering::Acquire)
    }
}
