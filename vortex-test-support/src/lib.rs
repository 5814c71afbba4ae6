//! # vortex-test-support
//!
//! Testing infrastructure for the vortex ring: sequence verification
//! helpers shared by the multithreaded ordering and barrier tests.

pub mod verify;

pub use verify::SequenceChecker;
