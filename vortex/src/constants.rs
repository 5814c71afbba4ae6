//! Sizing and spin-tuning constants for the ring.

/// Default ring capacity when none is given (must be power of 2)
pub const DEFAULT_CAPACITY: usize = 1024;

/// Maximum ring capacity after power-of-two round-up
pub const MAX_CAPACITY: usize = 1 << 30;

/// Cache line size for padding (64 bytes on most CPUs)
pub const CACHE_LINE_SIZE: usize = 64;

/// Tight-spin iterations before a waiting thread starts yielding
pub const SPIN_TRIES: u32 = 100;

/// Yield iterations before a waiting thread starts parking
pub const YIELD_TRIES: u32 = 100;

/// Park duration once spinning and yielding are exhausted
pub const PARK_NANOS: u64 = 1_000;
