//! Translator-based publishing facade.
//!
//! Binds a caller-provided translator closure to the claim/write/publish
//! protocol so callers never touch raw slot access: claim a sequence, run
//! the translator against the slot, publish. The translator must fill every
//! field downstream consumers rely on and must not retain the slot
//! reference beyond the call.

use std::sync::Arc;

use crate::error::{Result, VortexError};
use crate::ring_buffer::RingBuffer;

/// Publishes events by running translators against claimed slots.
pub struct EventPublisher<E> {
    ring: Arc<RingBuffer<E>>,
}

impl<E> EventPublisher<E> {
    pub fn new(ring: Arc<RingBuffer<E>>) -> Self {
        Self { ring }
    }

    /// Claim, translate, publish. Blocks while gating leaves no room.
    ///
    /// Returns the published sequence.
    pub fn publish_event<F>(&self, translator: F) -> Result<i64>
    where
        F: FnOnce(&mut E, i64),
    {
        let sequence = self.ring.next()?;
        // SAFETY: the claim above makes this thread the slot's only owner
        // until the publish below.
        unsafe {
            translator(self.ring.get_mut(sequence), sequence);
        }
        self.ring.publish(sequence);
        Ok(sequence)
    }

    /// Like [`publish_event`](Self::publish_event) but never blocks.
    ///
    /// Returns `Ok(false)` without side effects when the ring has no room
    /// against its gating sequences.
    pub fn try_publish_event<F>(&self, translator: F) -> Result<bool>
    where
        F: FnOnce(&mut E, i64),
    {
        let sequence = match self.ring.try_next() {
            Ok(sequence) => sequence,
            Err(VortexError::InsufficientCapacity) => return Ok(false),
            Err(e) => return Err(e),
        };
        // SAFETY: same exclusive-claim window as publish_event
        unsafe {
            translator(self.ring.get_mut(sequence), sequence);
        }
        self.ring.publish(sequence);
        Ok(true)
    }

    /// The ring this publisher feeds
    pub fn ring(&self) -> &Arc<RingBuffer<E>> {
        &self.ring
    }
}

impl<E> Clone for EventPublisher<E> {
    fn clone(&self) -> Self {
        Self {
            ring: self.ring.clone(),
        }
    }
}
