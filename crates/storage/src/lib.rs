//! Request record persistence and post-run statistics.
//!
//! Workers hand their records to a [`TelemetrySender`]; a single
//! [`CsvRecordWriter`] drains the channel into one CSV file. Once the run is
//! over a [`StatisticsAnalyzer`] re-reads that file and computes per-endpoint
//! latency figures plus a per-second request-start histogram.

mod analyzer;
mod error;
mod percentile;
mod reader;
mod report;
mod telemetry;
mod writer;

pub use analyzer::{EndpointLatency, LatencyStatistics, StatisticsAnalyzer};
pub use error::{StatsError, TelemetryError};
pub use percentile::CountingArray;
pub use reader::CsvStatsReader;
pub use report::RunReport;
pub use telemetry::{telemetry_channel, RecordBatch, TelemetryReceiver, TelemetrySender};
pub use writer::{
    spawn_writer, write_histogram, CsvRecordWriter, WriterSummary, HISTOGRAM_HEADER,
    RECORD_HEADER,
};
