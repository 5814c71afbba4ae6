//! Ring facade: slot storage plus the sequencer behind one type.

use std::sync::Arc;

use crate::barrier::SequenceBarrier;
use crate::batch::SequenceBatch;
use crate::claim::ClaimStrategy;
use crate::error::Result;
use crate::insights;
use crate::ring::RingStorage;
use crate::sequence::Sequence;
use crate::sequencer::Sequencer;
use crate::wait::WaitStrategy;
use crate::{ProducerKind, RingConfig};

/// Bounded pre-allocated ring of reusable event slots.
///
/// Producers claim a sequence, mutate the slot it addresses, and publish;
/// consumers wait on a [`SequenceBarrier`] and read published slots in
/// order. All coordination is by sequence values; the slots themselves are
/// never locked.
pub struct RingBuffer<E> {
    storage: RingStorage<E>,
    sequencer: Sequencer,
}

impl<E> RingBuffer<E> {
    /// Build a ring from `config`, filling every slot from `factory`.
    pub fn new<F>(config: RingConfig, factory: F) -> Result<Self>
    where
        F: FnMut() -> E,
    {
        let wait_strategy = config.wait_strategy.build();
        Self::with_wait_strategy(config, factory, wait_strategy)
    }

    /// Build a ring with a caller-supplied wait strategy implementation.
    pub fn with_wait_strategy<F>(
        config: RingConfig,
        factory: F,
        wait_strategy: Arc<dyn WaitStrategy>,
    ) -> Result<Self>
    where
        F: FnMut() -> E,
    {
        let storage = RingStorage::new(config.capacity, factory)?;
        let claim = match config.producer {
            ProducerKind::Single => ClaimStrategy::single_producer(),
            ProducerKind::Multi => ClaimStrategy::multi_producer(),
        };
        let sequencer = Sequencer::new(
            storage.capacity(),
            claim,
            wait_strategy,
            config.allow_ungated,
        );
        insights::record_ring_created(storage.capacity());
        Ok(Self { storage, sequencer })
    }

    /// Claim the next sequence, blocking while gating leaves no room
    #[inline]
    pub fn next(&self) -> Result<i64> {
        self.sequencer.next()
    }

    /// Claim `n` contiguous sequences
    #[inline]
    pub fn next_batch(&self, n: usize) -> Result<SequenceBatch> {
        self.sequencer.next_batch(n)
    }

    /// Claim the next sequence only if room exists right now
    #[inline]
    pub fn try_next(&self) -> Result<i64> {
        self.sequencer.try_next()
    }

    /// Make `sequence` visible to consumers
    #[inline]
    pub fn publish(&self, sequence: i64) {
        self.sequencer.publish(sequence);
    }

    /// Publish every sequence of a claimed batch
    #[inline]
    pub fn publish_batch(&self, batch: &SequenceBatch) {
        self.sequencer.publish_batch(batch);
    }

    /// Assert capacity for `sequence` without advancing the claim counter
    /// (single-producer force path)
    #[inline]
    pub fn claim(&self, sequence: i64) -> Result<()> {
        self.sequencer.claim(sequence)
    }

    /// Set claim counter and cursor to `sequence` (single-producer resync)
    #[inline]
    pub fn force_publish(&self, sequence: i64) -> Result<()> {
        self.sequencer.force_publish(sequence)
    }

    /// Barrier over the cursor and the given dependency sequences
    pub fn new_barrier(&self, dependencies: &[Arc<Sequence>]) -> SequenceBarrier {
        self.sequencer.new_barrier(dependencies)
    }

    /// Wire in the gating sequences; once, before the first claim
    pub fn add_gating_sequences(&self, sequences: &[Arc<Sequence>]) -> Result<()> {
        self.sequencer.add_gating_sequences(sequences)
    }

    /// Highest published sequence
    #[inline]
    pub fn cursor(&self) -> i64 {
        self.sequencer.cursor()
    }

    /// Capacity in slots (post round-up)
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Cancel producers spinning on gating capacity
    pub fn alert(&self) {
        self.sequencer.alert();
    }

    /// Lower the producer-side alert
    pub fn clear_alert(&self) {
        self.sequencer.clear_alert();
    }

    /// Shared reference to the slot for `sequence`.
    ///
    /// # Safety
    ///
    /// `sequence` must have been published (a barrier or the cursor said
    /// so) and a gating sequence the caller advances must still be behind
    /// it, so no producer can be rewriting the slot.
    #[inline]
    pub unsafe fn get(&self, sequence: i64) -> &E {
        self.storage.get(sequence)
    }

    /// Exclusive reference to the slot for `sequence`.
    ///
    /// # Safety
    ///
    /// The caller must hold the unpublished claim on `sequence`; between
    /// claim and publish the claimant is the slot's only owner.
    #[allow(clippy::mut_from_ref)]
    #[inline]
    pub unsafe fn get_mut(&self, sequence: i64) -> &mut E {
        self.storage.get_mut(sequence)
    }
}
