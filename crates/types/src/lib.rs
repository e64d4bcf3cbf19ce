//! Shared value types for the skiload harness: request records, phase
//! layouts and the run-wide aggregate counters.

pub mod aggregate;
pub mod phase;
pub mod record;

pub use aggregate::*;
pub use phase::*;
pub use record::*;
