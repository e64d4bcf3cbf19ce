use crate::latch::CountDownLatch;
use crate::worker::{PhaseLatches, RunContext, Worker};
use skiload_types::{assignments_for_phase, AssignmentError, PhaseSpec, PhaseSummary};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

pub const TRIGGER_PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("invalid phase layout: {0}")]
    Assignment(#[from] AssignmentError),
    #[error("failed to spawn thread {thread}: {source}")]
    Spawn {
        thread: String,
        #[source]
        source: io::Error,
    },
    #[error("phase '{phase}' was cancelled: a worker stopped before completing")]
    Cancelled { phase: String },
    #[error("{count} worker(s) of phase '{phase}' panicked")]
    WorkerPanicked { phase: String, count: usize },
    #[error("phase '{phase}' supervisor panicked")]
    PhasePanicked { phase: String },
}

/// Launches the workers of one phase at a time.
#[derive(Clone)]
pub struct PhaseOrchestrator {
    context: RunContext,
}

impl PhaseOrchestrator {
    pub fn new(context: RunContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// Runs `spec` to completion.
    pub fn run_phase(&self, spec: &PhaseSpec) -> Result<PhaseSummary, OrchestratorError> {
        self.launch(spec.clone())?.join()
    }

    /// Starts `spec` on its own supervisor thread and returns at once.
    ///
    /// Assignments and workers are built here, so a layout error surfaces
    /// before any worker of the phase starts.
    pub fn launch(&self, spec: PhaseSpec) -> Result<PhaseHandle, OrchestratorError> {
        let assignments = assignments_for_phase(&spec, self.context.total_skiers)?;
        let latches = PhaseLatches {
            trigger: Arc::new(CountDownLatch::new(spec.trigger_count())),
            completion: Arc::new(CountDownLatch::new(spec.thread_count)),
        };

        let workers = assignments
            .into_iter()
            .enumerate()
            .map(|(index, assignment)| {
                Worker::new(
                    format!("{}-{index}", spec.name),
                    assignment,
                    self.context.clone(),
                    latches.clone(),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            phase = %spec.name,
            threads = spec.thread_count,
            trigger = spec.trigger_count(),
            minutes = ?spec.time_window.range(),
            "starting phase"
        );

        let supervisor = PhaseSupervisor {
            spec: spec.clone(),
            workers,
            latches: latches.clone(),
            context: self.context.clone(),
        };
        let thread_name = format!("phase-{}", spec.name);
        let thread = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || supervisor.run())
            .map_err(|source| OrchestratorError::Spawn {
                thread: thread_name,
                source,
            })?;

        Ok(PhaseHandle {
            name: spec.name,
            latches,
            thread,
        })
    }
}

/// A phase running in the background.
pub struct PhaseHandle {
    name: String,
    latches: PhaseLatches,
    thread: JoinHandle<Result<PhaseSummary, OrchestratorError>>,
}

impl PhaseHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Workers that have not finished yet.
    pub fn pending_workers(&self) -> usize {
        self.latches.completion.count()
    }

    /// Blocks until enough workers finished to release the next phase,
    /// logging the remaining count every [`TRIGGER_PROGRESS_INTERVAL`].
    pub fn wait_for_trigger(&self) -> Result<(), OrchestratorError> {
        loop {
            match self.latches.trigger.wait_timeout(TRIGGER_PROGRESS_INTERVAL) {
                Ok(true) => break,
                Ok(false) => debug!(
                    phase = %self.name,
                    remaining = self.latches.trigger.count(),
                    "waiting for next-phase trigger"
                ),
                Err(_) => {
                    return Err(OrchestratorError::Cancelled {
                        phase: self.name.clone(),
                    })
                }
            }
        }
        debug!(phase = %self.name, "next phase released");
        Ok(())
    }

    /// Blocks until every worker has joined.
    pub fn join(self) -> Result<PhaseSummary, OrchestratorError> {
        self.thread
            .join()
            .unwrap_or_else(|_| Err(OrchestratorError::PhasePanicked { phase: self.name }))
    }
}

struct PhaseSupervisor {
    spec: PhaseSpec,
    workers: Vec<Worker>,
    latches: PhaseLatches,
    context: RunContext,
}

impl PhaseSupervisor {
    fn run(self) -> Result<PhaseSummary, OrchestratorError> {
        let phase = self.spec.name.clone();
        let mut handles = Vec::with_capacity(self.workers.len());
        let mut spawn_failure = None;

        for worker in self.workers {
            let thread_name = worker.label().to_string();
            match thread::Builder::new()
                .name(thread_name.clone())
                .spawn(move || worker.run())
            {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    error!(phase = %phase, thread = %thread_name, error = %source, "worker spawn failed");
                    self.latches.trigger.cancel();
                    self.latches.completion.cancel();
                    spawn_failure = Some(OrchestratorError::Spawn {
                        thread: thread_name,
                        source,
                    });
                    break;
                }
            }
        }

        let waited = self.latches.completion.wait();

        let panicked = handles
            .into_iter()
            .map(JoinHandle::join)
            .filter(Result::is_err)
            .count();

        if let Some(err) = spawn_failure {
            return Err(err);
        }
        if panicked > 0 {
            error!(phase = %phase, panicked, "workers panicked");
            return Err(OrchestratorError::WorkerPanicked {
                phase,
                count: panicked,
            });
        }
        if waited.is_err() {
            return Err(OrchestratorError::Cancelled { phase });
        }

        let requests = self.spec.total_requests();
        self.context.aggregate.add_requests(requests);
        info!(phase = %phase, threads = self.spec.thread_count, requests, "phase complete");
        Ok(PhaseSummary {
            name: phase,
            threads: self.spec.thread_count,
            requests,
        })
    }
}
