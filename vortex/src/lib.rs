//! Bounded, pre-allocated, single-ring event exchange.
//!
//! Coordinates producers and dependent consumer stages over a fixed-capacity
//! ring of reusable slots with a published-sequence protocol: claim a
//! sequence, write the slot it addresses, publish. No per-event allocation,
//! no locks on the fast path, and dependent stages can form arbitrary DAGs
//! while each stage observes events in monotonic sequence order.
//!
//! ## Building blocks
//!
//! | Type | Role |
//! |------|------|
//! | [`RingBuffer<E>`] | slot storage + sequencer behind one facade |
//! | [`Sequencer`] | claim/publish protocol, gating, batching |
//! | [`SequenceBarrier`] | consumer view: `min(cursor, dependencies)` + alert |
//! | [`WaitStrategy`] | how a consumer waits (blocking, spin, yield, sleep) |
//! | [`EventPublisher<E>`] | translator-closure publishing facade |
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use vortex::{EventPublisher, RingBuffer, RingConfig, Sequence};
//!
//! let ring = Arc::new(RingBuffer::new(RingConfig::new(64)?, || 0i64)?);
//! let consumed = Arc::new(Sequence::default());
//! ring.add_gating_sequences(&[consumed.clone()])?;
//!
//! let publisher = EventPublisher::new(ring.clone());
//! publisher.publish_event(|event, sequence| *event = sequence * 2)?;
//!
//! let barrier = ring.new_barrier(&[]);
//! let available = barrier.wait_for(0)?;
//! for sequence in 0..=available {
//!     // SAFETY: published per the barrier, gated by `consumed`
//!     let value = unsafe { *ring.get(sequence) };
//!     assert_eq!(value, sequence * 2);
//! }
//! consumed.set(available);
//! # Ok::<(), vortex::VortexError>(())
//! ```
//!
//! ## Safety
//!
//! Slot access (`get`/`get_mut`) is `unsafe`: exclusive writes between claim
//! and publish, and shared reads behind the cursor and a gating sequence,
//! are protocol obligations the compiler cannot check. The closure-based
//! [`EventPublisher`] wraps them safely for the common case.

pub mod barrier;
pub mod batch;
pub mod claim;
pub mod constants;
pub mod error;
pub mod insights;
pub mod publisher;
pub mod ring;
pub mod ring_buffer;
pub mod sequence;
pub mod sequencer;
pub mod wait;

pub use barrier::SequenceBarrier;
pub use batch::SequenceBatch;
pub use error::{Result, VortexError};
pub use publisher::EventPublisher;
pub use ring_buffer::RingBuffer;
pub use sequence::{minimum_sequence, Sequence, INITIAL_SEQUENCE};
pub use sequencer::Sequencer;
pub use wait::{
    BlockingWaitStrategy, BusySpinWaitStrategy, SleepingWaitStrategy, WaitStrategy,
    YieldingWaitStrategy,
};

use std::sync::Arc;

use crate::constants::DEFAULT_CAPACITY;

/// How many threads may claim sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerKind {
    /// Exactly one producer thread; claims need no atomics
    Single,
    /// Any number of producer threads; claims go through an atomic counter
    Multi,
}

/// Built-in wait strategies, selectable by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStrategyKind {
    /// Condition-variable blocking; balanced latency and CPU
    Blocking,
    /// Tight spin; lowest latency, burns a core
    BusySpin,
    /// Spin then yield; shares cores gracefully
    Yielding,
    /// Spin, yield, then park with backoff; lowest CPU
    Sleeping,
}

impl WaitStrategyKind {
    pub(crate) fn build(&self) -> Arc<dyn WaitStrategy> {
        match self {
            Self::Blocking => Arc::new(BlockingWaitStrategy::new()),
            Self::BusySpin => Arc::new(BusySpinWaitStrategy::new()),
            Self::Yielding => Arc::new(YieldingWaitStrategy::new()),
            Self::Sleeping => Arc::new(SleepingWaitStrategy::new()),
        }
    }
}

/// Configuration for ring construction
#[derive(Debug, Clone)]
pub struct RingConfig {
    /// Requested capacity; rounded up to the next power of two
    pub capacity: usize,
    /// Producer threading model
    pub producer: ProducerKind,
    /// Consumer wait strategy
    pub wait_strategy: WaitStrategyKind,
    /// Permit claiming with an empty gating set.
    ///
    /// An ungated ring never blocks producers and will overwrite slots
    /// regardless of consumer progress; that is almost always a
    /// misconfiguration, so the default denies the first claim instead.
    pub allow_ungated: bool,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            producer: ProducerKind::Single,
            wait_strategy: WaitStrategyKind::Blocking,
            allow_ungated: false,
        }
    }
}

impl RingConfig {
    /// Create a configuration with the given capacity
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(VortexError::config("ring capacity must be positive"));
        }
        Ok(Self {
            capacity,
            ..Default::default()
        })
    }

    /// Set the producer threading model
    pub fn with_producer(mut self, producer: ProducerKind) -> Self {
        self.producer = producer;
        self
    }

    /// Set the consumer wait strategy
    pub fn with_wait_strategy(mut self, wait_strategy: WaitStrategyKind) -> Self {
        self.wait_strategy = wait_strategy;
        self
    }

    /// Opt in to running without gating sequences
    pub fn allow_ungated(mut self, allow: bool) -> Self {
        self.allow_ungated = allow;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = RingConfig::default();
        assert_eq!(config.capacity, DEFAULT_CAPACITY);
        assert_eq!(config.producer, ProducerKind::Single);
        assert_eq!(config.wait_strategy, WaitStrategyKind::Blocking);
        assert!(!config.allow_ungated);
    }

    #[test]
    fn test_config_rejects_zero_capacity() {
        assert!(RingConfig::new(0).is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = RingConfig::new(2048)
            .unwrap()
            .with_producer(ProducerKind::Multi)
            .with_wait_strategy(WaitStrategyKind::BusySpin)
            .allow_ungated(true);

        assert_eq!(config.capacity, 2048);
        assert_eq!(config.producer, ProducerKind::Multi);
        assert_eq!(config.wait_strategy, WaitStrategyKind::BusySpin);
        assert!(config.allow_ungated);
    }
}
