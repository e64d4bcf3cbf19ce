use crate::error::StatsError;
use crate::reader::CsvStatsReader;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::thread::{self, ScopedJoinHandle};
use tracing::{debug, warn};

/// Outcome of every post-run computation. Each one succeeds or fails on its
/// own; a failure in one never hides the others.
#[derive(Debug)]
pub struct LatencyStatistics {
    pub mean: Result<BTreeMap<String, f64>, StatsError>,
    pub max: Result<BTreeMap<String, u64>, StatsError>,
    pub median: Result<BTreeMap<String, u64>, StatsError>,
    pub p99: Result<BTreeMap<String, u64>, StatsError>,
    pub requests_started_per_second: Result<Vec<u64>, StatsError>,
}

/// Latency figures for one `"<METHOD> <path>"` key, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointLatency {
    pub endpoint: String,
    pub mean_ms: Option<f64>,
    pub median_ms: Option<u64>,
    pub p99_ms: Option<u64>,
    pub max_ms: Option<u64>,
}

impl LatencyStatistics {
    /// Per-endpoint view over whichever computations succeeded.
    pub fn endpoints(&self) -> Vec<EndpointLatency> {
        let mut keys = BTreeSet::new();
        if let Ok(mean) = &self.mean {
            keys.extend(mean.keys().cloned());
        }
        for map in [&self.max, &self.median, &self.p99].into_iter().flatten() {
            keys.extend(map.keys().cloned());
        }

        keys.into_iter()
            .map(|key| EndpointLatency {
                mean_ms: lookup(&self.mean, &key),
                median_ms: lookup(&self.median, &key),
                p99_ms: lookup(&self.p99, &key),
                max_ms: lookup(&self.max, &key),
                endpoint: key,
            })
            .collect()
    }

    /// Messages for every computation that failed.
    pub fn errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut push = |name: &str, err: Option<&StatsError>| {
            if let Some(err) = err {
                errors.push(format!("{name}: {err}"));
            }
        };
        push("mean", self.mean.as_ref().err());
        push("max", self.max.as_ref().err());
        push("median", self.median.as_ref().err());
        push("p99", self.p99.as_ref().err());
        push("histogram", self.requests_started_per_second.as_ref().err());
        errors
    }
}

fn lookup<T: Copy>(map: &Result<BTreeMap<String, T>, StatsError>, key: &str) -> Option<T> {
    map.as_ref().ok().and_then(|values| values.get(key).copied())
}

/// Post-run statistics over the request record file.
#[derive(Debug, Clone)]
pub struct StatisticsAnalyzer {
    reader: CsvStatsReader,
}

impl StatisticsAnalyzer {
    pub fn new(csv_path: impl Into<PathBuf>) -> Self {
        Self {
            reader: CsvStatsReader::new(csv_path),
        }
    }

    pub fn reader(&self) -> &CsvStatsReader {
        &self.reader
    }

    /// Runs all computations and blocks until they finish.
    ///
    /// Mean and histogram start immediately on their own threads while the
    /// max pass runs here; median and p99 need the max for array sizing and
    /// start once it is known.
    pub fn analyze(&self, wall_start_ms: i64, wall_stop_ms: i64) -> LatencyStatistics {
        let reader = &self.reader;
        debug!(path = %reader.path().display(), "analysing request records");

        let statistics = thread::scope(|scope| {
            let mean = scope.spawn(|| reader.mean_latencies());
            let histogram =
                scope.spawn(|| reader.requests_started_per_second(wall_start_ms, wall_stop_ms));

            let max = reader.max_latencies();
            let (median, p99) = match &max {
                Ok(max_by_key) => thread::scope(|dependent| {
                    let median = dependent.spawn(|| reader.median_latencies(max_by_key));
                    let p99 = dependent.spawn(|| reader.p99_latencies(max_by_key));
                    (join(median, "median"), join(p99, "p99"))
                }),
                Err(err) => (
                    Err(StatsError::MaxUnavailable(err.to_string())),
                    Err(StatsError::MaxUnavailable(err.to_string())),
                ),
            };

            LatencyStatistics {
                mean: join(mean, "mean"),
                max,
                median,
                p99,
                requests_started_per_second: join(histogram, "histogram"),
            }
        });

        for err in statistics.errors() {
            warn!(error = %err, "statistics computation failed");
        }
        statistics
    }
}

fn join<T>(
    handle: ScopedJoinHandle<'_, Result<T, StatsError>>,
    computation: &'static str,
) -> Result<T, StatsError> {
    handle
        .join()
        .unwrap_or_else(|_| Err(StatsError::ComputationPanicked { computation }))
}
