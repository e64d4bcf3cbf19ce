use crate::record::now_ms;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

const MILLIS_PER_SEC: f64 = 1_000.0;

/// Process-lifetime counters shared by every worker of a run.
///
/// The counters are only ever incremented; they are read once all workers
/// have joined, so relaxed ordering is sufficient.
#[derive(Debug, Default)]
pub struct RunAggregate {
    total_requests: AtomicU64,
    failed_requests: AtomicU64,
    wall_start_ms: AtomicI64,
    wall_stop_ms: AtomicI64,
    latest_start_ms: AtomicI64,
}

impl RunAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_requests(&self, count: u64) {
        self.total_requests.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn failed_requests(&self) -> u64 {
        self.failed_requests.load(Ordering::Relaxed)
    }

    pub fn start_wall_timer(&self) {
        self.wall_start_ms.store(now_ms(), Ordering::Relaxed);
    }

    /// Notes the start time of a request about to be sent.
    pub fn observe_request_start(&self, start_ms: i64) {
        self.latest_start_ms.fetch_max(start_ms, Ordering::Relaxed);
    }

    /// Stops the wall clock strictly after the latest observed request
    /// start, so every start falls inside `[wall_start, wall_stop)`.
    pub fn stop_wall_timer(&self) {
        let latest_start = self.latest_start_ms.load(Ordering::Relaxed);
        let stop = now_ms().max(latest_start.saturating_add(1));
        self.wall_stop_ms.store(stop, Ordering::Relaxed);
    }

    /// Overrides both wall-clock marks, for replaying a recorded run.
    pub fn set_wall_clock(&self, start_ms: i64, stop_ms: i64) {
        self.wall_start_ms.store(start_ms, Ordering::Relaxed);
        self.wall_stop_ms.store(stop_ms, Ordering::Relaxed);
    }

    pub fn wall_start_ms(&self) -> i64 {
        self.wall_start_ms.load(Ordering::Relaxed)
    }

    pub fn wall_stop_ms(&self) -> i64 {
        self.wall_stop_ms.load(Ordering::Relaxed)
    }

    pub fn wall_time_secs(&self) -> f64 {
        (self.wall_stop_ms() - self.wall_start_ms()).max(0) as f64 / MILLIS_PER_SEC
    }

    /// All requests per second of wall time; 0 when no time elapsed.
    pub fn throughput_per_sec(&self) -> f64 {
        per_second(self.total_requests(), self.wall_time_secs())
    }

    /// Successful requests per second of wall time.
    pub fn success_throughput_per_sec(&self) -> f64 {
        let good = self.total_requests().saturating_sub(self.failed_requests());
        per_second(good, self.wall_time_secs())
    }
}

fn per_second(count: u64, secs: f64) -> f64 {
    if secs <= 0.0 {
        0.0
    } else {
        count as f64 / secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn concurrent_increments_are_not_lost() {
        let aggregate = Arc::new(RunAggregate::new());
        thread::scope(|scope| {
            for _ in 0..8 {
                let aggregate = Arc::clone(&aggregate);
                scope.spawn(move || {
                    for _ in 0..1_000 {
                        aggregate.record_failure();
                        aggregate.add_requests(2);
                    }
                });
            }
        });
        assert_eq!(aggregate.failed_requests(), 8_000);
        assert_eq!(aggregate.total_requests(), 16_000);
    }

    #[test]
    fn throughput_uses_wall_time() {
        let aggregate = RunAggregate::new();
        aggregate.add_requests(56);
        for _ in 0..5 {
            aggregate.record_failure();
        }
        aggregate.set_wall_clock(10_000, 12_000);

        assert!((aggregate.wall_time_secs() - 2.0).abs() < 1e-9);
        assert!((aggregate.throughput_per_sec() - 28.0).abs() < 1e-9);
        assert!((aggregate.success_throughput_per_sec() - 25.5).abs() < 1e-9);
    }

    #[test]
    fn wall_stop_lands_after_latest_request_start() {
        let aggregate = RunAggregate::new();
        aggregate.start_wall_timer();
        let late_start = now_ms() + 60_000;
        aggregate.observe_request_start(late_start - 10);
        aggregate.observe_request_start(late_start);
        aggregate.stop_wall_timer();

        assert_eq!(aggregate.wall_stop_ms(), late_start + 1);
    }

    #[test]
    fn zero_wall_time_reports_zero_throughput() {
        let aggregate = RunAggregate::new();
        aggregate.add_requests(10);
        aggregate.set_wall_clock(5, 5);
        assert_eq!(aggregate.throughput_per_sec(), 0.0);
    }
}
