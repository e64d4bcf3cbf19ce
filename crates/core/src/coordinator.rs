use crate::config::{ConfigError, RunConfig};
use crate::orchestrator::{OrchestratorError, PhaseHandle, PhaseOrchestrator};
use crate::schedule::standard_schedule;
use crate::worker::RunContext;
use skiload_sdk::SkiersApi;
use skiload_storage::{
    spawn_writer, telemetry_channel, write_histogram, CsvRecordWriter, LatencyStatistics,
    RunReport, StatisticsAnalyzer, StatsError, WriterSummary,
};
use skiload_types::{
    assignments_for_phase, AssignmentError, PhaseSpec, PhaseSummary, RunAggregate,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid phase schedule: {0}")]
    Schedule(#[from] AssignmentError),
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
    #[error("cannot persist request records: {0}")]
    Persistence(#[from] StatsError),
    #[error("failed to spawn persistence writer: {0}")]
    WriterSpawn(#[source] io::Error),
    #[error("persistence writer panicked")]
    WriterPanicked,
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    pub statistics: LatencyStatistics,
    pub writer: WriterSummary,
    pub csv_path: PathBuf,
    /// `None` when the histogram could not be computed or written.
    pub histogram_path: Option<PathBuf>,
}

/// Sequences the phases of a run and produces its report.
pub struct RunCoordinator {
    config: RunConfig,
    client: Arc<dyn SkiersApi>,
    schedule: Vec<PhaseSpec>,
}

impl RunCoordinator {
    /// Coordinator with the standard schedule for `config.max_threads`.
    pub fn new(config: RunConfig, client: Arc<dyn SkiersApi>) -> Result<Self, RunError> {
        let schedule = standard_schedule(config.max_threads)?;
        Ok(Self {
            config,
            client,
            schedule,
        })
    }

    /// Replaces the phase list.
    pub fn with_schedule(mut self, schedule: Vec<PhaseSpec>) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn schedule(&self) -> &[PhaseSpec] {
        &self.schedule
    }

    /// Checks every phase against the skier population. Phases are
    /// partitioned again at launch; this only makes a bad layout fail
    /// before the first request.
    pub fn validate_schedule(&self) -> Result<(), RunError> {
        for spec in &self.schedule {
            assignments_for_phase(spec, self.config.num_skiers)?;
        }
        Ok(())
    }

    pub fn run(&self) -> Result<RunOutcome, RunError> {
        self.validate_schedule()?;
        let csv_path = self.config.csv_path();
        let writer = CsvRecordWriter::create(&csv_path)?;
        let (telemetry, receiver) = telemetry_channel();
        let aggregate = Arc::new(RunAggregate::new());

        info!(
            client = self.client.name(),
            host = %self.config.host_address,
            resort = %self.config.resort,
            day = self.config.ski_day,
            skiers = self.config.num_skiers,
            max_threads = self.config.max_threads,
            csv = %csv_path.display(),
            "starting run"
        );

        aggregate.start_wall_timer();
        let writer_thread = spawn_writer(writer, receiver).map_err(RunError::WriterSpawn)?;

        let orchestrator = PhaseOrchestrator::new(RunContext {
            client: Arc::clone(&self.client),
            telemetry: telemetry.clone(),
            aggregate: Arc::clone(&aggregate),
            resort: self.config.resort.clone(),
            ski_day: self.config.ski_day,
            num_lifts: self.config.num_lifts,
            total_skiers: self.config.num_skiers,
        });
        let phases = self.run_phases(&orchestrator);
        aggregate.stop_wall_timer();

        if let Err(err) = telemetry.close() {
            error!(error = %err, "could not signal end of records");
        }
        let writer = writer_thread.join().map_err(|_| RunError::WriterPanicked)?;
        let phases = phases?;

        if writer.rows != aggregate.total_requests() {
            warn!(
                rows = writer.rows,
                expected = aggregate.total_requests(),
                "persisted rows differ from issued requests"
            );
        }
        info!(
            requests = aggregate.total_requests(),
            failed = aggregate.failed_requests(),
            wall_secs = aggregate.wall_time_secs(),
            "all phases complete"
        );

        let statistics = StatisticsAnalyzer::new(&csv_path)
            .analyze(aggregate.wall_start_ms(), aggregate.wall_stop_ms());
        let histogram_path = self.persist_histogram(&statistics);
        let report = RunReport::new(&aggregate, phases, &statistics);

        Ok(RunOutcome {
            report,
            statistics,
            writer,
            csv_path,
            histogram_path,
        })
    }

    /// Launches each phase once the previous one released its trigger, then
    /// joins them all. Every launched phase is joined even after a failure.
    fn run_phases(&self, orchestrator: &PhaseOrchestrator) -> Result<Vec<PhaseSummary>, RunError> {
        let mut launched: Vec<PhaseHandle> = Vec::with_capacity(self.schedule.len());
        let mut failure = None;

        for spec in &self.schedule {
            println!(
                "Starting {} phase: {} threads, minutes {}-{}",
                spec.name, spec.thread_count, spec.time_window.low, spec.time_window.high
            );
            let handle = match orchestrator.launch(spec.clone()) {
                Ok(handle) => handle,
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            };
            let released = handle.wait_for_trigger();
            launched.push(handle);
            if let Err(err) = released {
                failure = Some(err);
                break;
            }
        }

        let mut summaries = Vec::with_capacity(launched.len());
        let mut join_failure = None;
        for handle in launched {
            match handle.join() {
                Ok(summary) => summaries.push(summary),
                Err(err) => {
                    error!(error = %err, "phase failed");
                    join_failure.get_or_insert(err);
                }
            }
        }

        match join_failure.or(failure) {
            Some(err) => Err(err.into()),
            None => Ok(summaries),
        }
    }

    fn persist_histogram(&self, statistics: &LatencyStatistics) -> Option<PathBuf> {
        let buckets = statistics.requests_started_per_second.as_ref().ok()?;
        let path = self.config.histogram_path();
        match write_histogram(&path, buckets) {
            Ok(()) => Some(path),
            Err(err) => {
                error!(path = %path.display(), error = %err, "could not write request-start histogram");
                None
            }
        }
    }
}
