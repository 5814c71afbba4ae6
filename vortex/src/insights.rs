//! Observability hooks for the ring.
//!
//! Thin tracing shims, zero-cost when the `tracing` feature is disabled.
//! Only slow paths are instrumented; the per-event claim/publish path never
//! touches these.
//!
//! # Usage
//!
//! ```toml
//! vortex = { version = "0.1", features = ["tracing"] }
//! ```
//! ```rust,ignore
//! tracing_subscriber::fmt::init();
//! ```

/// Record a producer entering the backpressure spin (gating is tight)
#[cfg(feature = "tracing")]
#[inline]
pub fn record_backpressure(sequence: i64) {
    let _span = tracing::warn_span!("backpressure", sequence).entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_backpressure(_sequence: i64) {}

/// Record an alert being raised on a barrier or sequencer
#[cfg(feature = "tracing")]
#[inline]
pub fn record_alert() {
    let _span = tracing::debug_span!("alert").entered();
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_alert() {}

/// Record ring construction
#[cfg(feature = "tracing")]
#[inline]
pub fn record_ring_created(capacity: usize) {
    tracing::debug!(capacity, "ring created");
}

#[cfg(not(feature = "tracing"))]
#[inline(always)]
pub fn record_ring_created(_capacity: usize) {}
