//! Error types and handling for the vortex library

use thiserror::Error;

/// Result type alias for vortex operations
pub type Result<T> = std::result::Result<T, VortexError>;

/// Main error type for the vortex library
#[derive(Error, Debug)]
pub enum VortexError {
    /// The ring has no room for the requested claim; returned only by
    /// non-blocking try paths and never leaves side effects behind.
    #[error("insufficient capacity in ring")]
    InsufficientCapacity,

    /// Cooperative cancellation raised through a barrier or sequencer.
    /// Recoverable; the consumer's outer loop decides what to do next.
    #[error("alerted while waiting")]
    Alert,

    /// A timed wait elapsed before the requested sequence was published
    #[error("operation timed out")]
    Timeout,

    /// Invalid construction or argument value
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Error message describing the configuration issue
        message: String,
    },

    /// API misuse: an operation was issued in a state that forbids it
    #[error("illegal state: {message}")]
    IllegalState {
        /// Error message describing the misuse
        message: String,
    },
}

impl VortexError {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a new illegal-state error
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable by retrying or re-queuing
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientCapacity | Self::Alert | Self::Timeout
        )
    }

    /// Check if this error signals cooperative cancellation
    pub fn is_alert(&self) -> bool {
        matches!(self, Self::Alert)
    }
}
