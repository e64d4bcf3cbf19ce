use crate::error::{StatsError, TelemetryError};
use crate::telemetry::TelemetryReceiver;
use skiload_types::RequestRecord;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Header row of the request record file.
pub const RECORD_HEADER: [&str; 5] = [
    "RequestType",
    "Path",
    "StartTimestamp(ms)",
    "Latency(ms)",
    "ResponseCode",
];

/// Header row of the request-start histogram file.
pub const HISTOGRAM_HEADER: [&str; 2] = ["Minute", "Num Requests Started"];

/// Rows and batches persisted by a writer before end-of-stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterSummary {
    pub batches: u64,
    pub rows: u64,
}

/// Sole owner of the request record file for the lifetime of a run.
pub struct CsvRecordWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl CsvRecordWriter {
    /// Creates (or truncates) `path` and writes the header row.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, StatsError> {
        let path = path.as_ref().to_path_buf();
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .map_err(|err| StatsError::csv(&path, err))?;
        writer
            .write_record(RECORD_HEADER)
            .map_err(|err| StatsError::csv(&path, err))?;
        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one row per record. Output stays buffered.
    pub fn write_batch(&mut self, batch: &[RequestRecord]) -> Result<u64, StatsError> {
        for record in batch {
            self.writer
                .serialize(record)
                .map_err(|err| StatsError::csv(&self.path, err))?;
        }
        Ok(batch.len() as u64)
    }

    /// Flushes everything buffered so far to the file.
    pub fn flush(&mut self) -> Result<(), StatsError> {
        self.writer
            .flush()
            .map_err(|err| StatsError::io(&self.path, err))
    }

    /// Consumes batches until end-of-stream, then flushes.
    pub fn drain(mut self, receiver: &TelemetryReceiver) -> Result<WriterSummary, StatsError> {
        let mut summary = WriterSummary::default();
        loop {
            match receiver.next_batch() {
                Ok(Some(batch)) => {
                    summary.rows += self.write_batch(&batch)?;
                    summary.batches += 1;
                }
                Ok(None) => break,
                Err(TelemetryError::Disconnected) => {
                    warn!(
                        path = %self.path.display(),
                        "telemetry producers went away without end-of-stream"
                    );
                    break;
                }
                Err(TelemetryError::Closed) => break,
            }
        }
        self.flush()?;
        debug!(
            path = %self.path.display(),
            rows = summary.rows,
            batches = summary.batches,
            "request record file flushed"
        );
        Ok(summary)
    }
}

/// Runs `writer` on a dedicated thread.
///
/// A write failure while draining terminates the process: the record file is
/// the only durable output of a run.
pub fn spawn_writer(
    writer: CsvRecordWriter,
    receiver: TelemetryReceiver,
) -> io::Result<JoinHandle<WriterSummary>> {
    thread::Builder::new()
        .name("csv-writer".to_string())
        .spawn(move || {
            let path = writer.path().to_path_buf();
            match writer.drain(&receiver) {
                Ok(summary) => {
                    info!(path = %path.display(), rows = summary.rows, "request records persisted");
                    summary
                }
                Err(err) => fatal(&err),
            }
        })
}

fn fatal(err: &StatsError) -> ! {
    error!(error = %err, "cannot persist request records, stopping");
    eprintln!("cannot persist request records: {err}");
    std::process::exit(1)
}

/// Writes the per-second request-start histogram, replacing any old file.
pub fn write_histogram(path: impl AsRef<Path>, buckets: &[u64]) -> Result<(), StatsError> {
    let path = path.as_ref();
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|err| StatsError::csv(path, err))?;
    writer
        .write_record(HISTOGRAM_HEADER)
        .map_err(|err| StatsError::csv(path, err))?;
    for (second, count) in buckets.iter().enumerate() {
        writer
            .write_record([second.to_string(), count.to_string()])
            .map_err(|err| StatsError::csv(path, err))?;
    }
    writer.flush().map_err(|err| StatsError::io(path, err))
}
