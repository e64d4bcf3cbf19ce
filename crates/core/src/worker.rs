use crate::latch::CountDownLatch;
use rand::Rng;
use skiload_sdk::{ApiRequest, LiftRide, SkiersApi};
use skiload_storage::TelemetrySender;
use skiload_types::{now_ms, AssignmentError, RequestRecord, RunAggregate, WorkerAssignment};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, error, warn};

/// Everything the workers of a run share.
#[derive(Clone)]
pub struct RunContext {
    pub client: Arc<dyn SkiersApi>,
    pub telemetry: TelemetrySender,
    pub aggregate: Arc<RunAggregate>,
    pub resort: String,
    pub ski_day: u32,
    pub num_lifts: u32,
    pub total_skiers: u32,
}

/// The pair of latches every worker of a phase reports to.
#[derive(Debug, Clone)]
pub struct PhaseLatches {
    /// Releases the next phase.
    pub trigger: Arc<CountDownLatch>,
    /// Releases the phase's own join.
    pub completion: Arc<CountDownLatch>,
}

/// Signals the phase latches when the worker is done, however it ends.
struct CompletionSignal {
    latches: PhaseLatches,
}

impl Drop for CompletionSignal {
    fn drop(&mut self) {
        if thread::panicking() {
            self.latches.trigger.cancel();
            self.latches.completion.cancel();
        } else {
            self.latches.trigger.count_down();
            self.latches.completion.count_down();
        }
    }
}

/// One thread's share of a phase.
pub struct Worker {
    label: String,
    assignment: WorkerAssignment,
    context: RunContext,
    latches: PhaseLatches,
}

impl Worker {
    pub fn new(
        label: impl Into<String>,
        assignment: WorkerAssignment,
        context: RunContext,
        latches: PhaseLatches,
    ) -> Result<Self, AssignmentError> {
        if context.num_lifts == 0 {
            return Err(AssignmentError::InvertedRange {
                what: "lift id range",
                low: 1,
                high: 0,
            });
        }
        Ok(Self {
            label: label.into(),
            assignment,
            context,
            latches,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Issues every call of the assignment, hands the batch to telemetry and
    /// then counts down both latches. Returns the number of records sent.
    pub fn run(self) -> usize {
        let _signal = CompletionSignal {
            latches: self.latches.clone(),
        };
        let mut rng = rand::thread_rng();
        let assignment = &self.assignment;
        let resort = self.context.resort.as_str();
        let mut batch = Vec::with_capacity(assignment.expected_records());

        let mut ride = LiftRide::template(resort, self.context.ski_day);
        for _ in 0..assignment.write_count {
            ride.skier_id = rng.gen_range(assignment.skier_ids.clone());
            ride.lift_id = rng.gen_range(1..=self.context.num_lifts);
            ride.time = rng.gen_range(assignment.time_window.range());
            batch.push(self.call(&ApiRequest::WriteLiftRide(&ride)));
        }
        for _ in 0..assignment.read_count {
            let request = ApiRequest::SkierDayVertical {
                resort,
                day: self.context.ski_day,
                skier_id: rng.gen_range(assignment.skier_ids.clone()),
            };
            batch.push(self.call(&request));
        }
        for _ in 0..assignment.read_count {
            let request = ApiRequest::SkierResortTotals {
                skier_id: rng.gen_range(assignment.skier_ids.clone()),
                resort,
            };
            batch.push(self.call(&request));
        }

        let records = batch.len();
        if let Err(err) = self.context.telemetry.send(batch) {
            error!(worker = %self.label, records, error = %err, "dropping worker records");
        }
        debug!(worker = %self.label, records, "worker finished");
        records
    }

    /// Any non-2xx outcome counts as a failure, whether the server answered
    /// or the transport gave out.
    fn call(&self, request: &ApiRequest<'_>) -> RequestRecord {
        let start_time_ms = now_ms();
        self.context.aggregate.observe_request_start(start_time_ms);
        let started = Instant::now();
        let result = self.context.client.submit(request);
        let latency_ms = started.elapsed().as_millis() as u64;

        let code = match &result {
            Ok(code) => *code,
            Err(err) => err.code,
        };
        let record =
            RequestRecord::new(request.kind(), request.path(), start_time_ms, latency_ms, code);
        if !record.is_success() {
            self.context.aggregate.record_failure();
            match &result {
                Err(err) => warn!(
                    worker = %self.label,
                    method = request.kind().method(),
                    path = request.path(),
                    code = err.code,
                    transport = err.is_transport(),
                    error = %err.message,
                    "request failed"
                ),
                Ok(code) => warn!(
                    worker = %self.label,
                    method = request.kind().method(),
                    path = request.path(),
                    code,
                    "request answered with non-success status"
                ),
            }
        }
        record
    }
}
