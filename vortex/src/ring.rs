//! Fixed slot storage for the ring.
//!
//! The storage itself has no concurrency control. Every slot is allocated
//! once at construction from a caller-supplied factory and reused forever;
//! exclusive write access between claim and publish, and read-only access
//! after publish, are guaranteed entirely by the sequence protocol in
//! [`Sequencer`](crate::sequencer::Sequencer).

use std::cell::UnsafeCell;

use crate::constants::MAX_CAPACITY;
use crate::error::{Result, VortexError};

/// Ring-indexed slot array with power-of-two capacity.
pub struct RingStorage<E> {
    slots: Box<[UnsafeCell<E>]>,
    mask: usize,
}

impl<E> RingStorage<E> {
    /// Allocate the ring, rounding `capacity` up to the next power of two
    /// and filling every slot from `factory`.
    pub fn new<F>(capacity: usize, mut factory: F) -> Result<Self>
    where
        F: FnMut() -> E,
    {
        if capacity == 0 {
            return Err(VortexError::config("ring capacity must be positive"));
        }
        let capacity = capacity.next_power_of_two();
        if capacity > MAX_CAPACITY {
            return Err(VortexError::config(format!(
                "ring capacity {} exceeds maximum {}",
                capacity, MAX_CAPACITY
            )));
        }

        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(factory()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            mask: capacity - 1,
            slots,
        })
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline(always)]
    pub fn mask(&self) -> usize {
        self.mask
    }

    /// Shared reference to the slot for `sequence`.
    ///
    /// # Safety
    ///
    /// The sequence must have been published (cursor >= sequence) and must
    /// not yet be reclaimed by a producer (claim cursor < sequence +
    /// capacity, guaranteed while a gating sequence is < sequence).
    #[inline(always)]
    pub unsafe fn get(&self, sequence: i64) -> &E {
        &*self.slots[(sequence as usize) & self.mask].get()
    }

    /// Exclusive reference to the slot for `sequence`.
    ///
    /// # Safety
    ///
    /// The caller must hold the claim on `sequence` and must not have
    /// published it yet; that window is the only time a slot has a single
    /// owner.
    #[allow(clippy::mut_from_ref)]
    #[inline(always)]
    pub unsafe fn get_mut(&self, sequence: i64) -> &mut E {
        &mut *self.slots[(sequence as usize) & self.mask].get()
    }
}

// SAFETY: slots are plain memory; the claim/publish protocol gives every
// slot exactly one writer between claim and publish and read-only access
// after publish, so cross-thread access never aliases a live &mut.
unsafe impl<E: Send> Send for RingStorage<E> {}
unsafe impl<E: Send + Sync> Sync for RingStorage<E> {}
