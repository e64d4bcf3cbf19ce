//! Phase engine of the skiload harness.
//!
//! A [`RunCoordinator`] walks the phase schedule. Each phase is handed to the
//! [`PhaseOrchestrator`], which splits the skier population across worker
//! threads and releases the next phase once a share of its workers is done.
//! Workers stream their request records to the storage writer; the run ends
//! with a [`RunReport`](skiload_storage::RunReport) computed from that file.

pub mod config;
pub mod coordinator;
pub mod latch;
pub mod orchestrator;
pub mod schedule;
pub mod worker;

pub use config::{ConfigError, RunConfig};
pub use coordinator::{RunCoordinator, RunError, RunOutcome};
pub use latch::{CountDownLatch, LatchError};
pub use orchestrator::{OrchestratorError, PhaseHandle, PhaseOrchestrator};
pub use schedule::{schedule_with_volumes, standard_schedule};
pub use worker::{PhaseLatches, RunContext, Worker};
