use std::path::PathBuf;
use thiserror::Error;

/// Errors from persisting or analysing request records.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: line {line}: field {column} has malformed value '{value}'")]
    MalformedField {
        path: PathBuf,
        line: u64,
        column: &'static str,
        value: String,
    },
    #[error(
        "request started at {start_time_ms} ms is outside the {buckets} one-second buckets \
         beginning at {wall_start_ms} ms"
    )]
    BucketOutOfRange {
        start_time_ms: i64,
        wall_start_ms: i64,
        buckets: usize,
    },
    #[error("no max latency known for {key}")]
    MissingMaxLatency { key: String },
    #[error("latency {latency} ms for {key} exceeds recorded max {max} ms")]
    LatencyAboveMax { key: String, latency: u64, max: u64 },
    #[error("max latency unavailable: {0}")]
    MaxUnavailable(String),
    #[error("{computation} computation panicked")]
    ComputationPanicked { computation: &'static str },
}

impl StatsError {
    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        StatsError::Csv {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StatsError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Telemetry channel errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TelemetryError {
    #[error("telemetry consumer has shut down")]
    Closed,
    #[error("all telemetry producers dropped before end-of-stream")]
    Disconnected,
}
