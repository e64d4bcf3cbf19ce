use crate::analyzer::{EndpointLatency, LatencyStatistics};
use serde::Serialize;
use skiload_types::{PhaseSummary, RunAggregate};
use std::fmt;

/// Final statistics of one run, printable and serializable.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub total_requests: u64,
    pub bad_requests: u64,
    pub wall_start_ms: i64,
    pub wall_stop_ms: i64,
    pub wall_time_secs: f64,
    pub throughput_per_sec: f64,
    pub success_throughput_per_sec: f64,
    pub phases: Vec<PhaseSummary>,
    pub endpoints: Vec<EndpointLatency>,
    pub request_start_buckets: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl RunReport {
    pub fn new(
        aggregate: &RunAggregate,
        phases: Vec<PhaseSummary>,
        statistics: &LatencyStatistics,
    ) -> Self {
        Self {
            total_requests: aggregate.total_requests(),
            bad_requests: aggregate.failed_requests(),
            wall_start_ms: aggregate.wall_start_ms(),
            wall_stop_ms: aggregate.wall_stop_ms(),
            wall_time_secs: aggregate.wall_time_secs(),
            throughput_per_sec: aggregate.throughput_per_sec(),
            success_throughput_per_sec: aggregate.success_throughput_per_sec(),
            phases,
            endpoints: statistics.endpoints(),
            request_start_buckets: statistics
                .requests_started_per_second
                .as_ref()
                .map(Vec::len)
                .unwrap_or(0),
            errors: statistics.errors(),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

struct OrNa<T>(Option<T>);

impl<T: fmt::Display> fmt::Display for OrNa<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(value) => value.fmt(f),
            None => f.write_str("n/a"),
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Execution Statistics")?;
        writeln!(f, "--------------------")?;
        writeln!(f, "Total Requests: {}", self.total_requests)?;
        writeln!(f, "Bad Requests: {}", self.bad_requests)?;
        writeln!(f, "Wall Time: {:.2} seconds", self.wall_time_secs)?;
        writeln!(
            f,
            "Total Throughput: {:.2} requests/second",
            self.throughput_per_sec
        )?;
        writeln!(
            f,
            "Success Throughput: {:.2} requests/second",
            self.success_throughput_per_sec
        )?;
        for endpoint in &self.endpoints {
            writeln!(f, "Latencies (ms) for {}:", endpoint.endpoint)?;
            match endpoint.mean_ms {
                Some(mean) => writeln!(f, "\tMean: {mean:.2}")?,
                None => writeln!(f, "\tMean: n/a")?,
            }
            writeln!(f, "\tMedian: {}", OrNa(endpoint.median_ms))?;
            writeln!(f, "\t99th Percentile: {}", OrNa(endpoint.p99_ms))?;
            writeln!(f, "\tMax: {}", OrNa(endpoint.max_ms))?;
        }
        for error in &self.errors {
            writeln!(f, "Statistics error: {error}")?;
        }
        Ok(())
    }
}
