use crate::error::TelemetryError;
use crossbeam_channel::{Receiver, Sender};
use skiload_types::RequestRecord;

/// All records produced by one worker, in call order.
pub type RecordBatch = Vec<RequestRecord>;

/// Creates the unbounded worker-to-writer channel.
pub fn telemetry_channel() -> (TelemetrySender, TelemetryReceiver) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (TelemetrySender { tx }, TelemetryReceiver { rx })
}

/// Producer half, cloned into every worker.
#[derive(Debug, Clone)]
pub struct TelemetrySender {
    tx: Sender<RecordBatch>,
}

impl TelemetrySender {
    /// Queues a batch without waiting on the consumer.
    ///
    /// An empty batch is the end-of-stream marker, so empty batches from a
    /// worker with nothing to report are dropped here instead of being sent.
    pub fn send(&self, batch: RecordBatch) -> Result<(), TelemetryError> {
        if batch.is_empty() {
            return Ok(());
        }
        self.tx.send(batch).map_err(|_| TelemetryError::Closed)
    }

    /// Queues the end-of-stream marker behind every batch already sent.
    pub fn close(&self) -> Result<(), TelemetryError> {
        self.tx.send(Vec::new()).map_err(|_| TelemetryError::Closed)
    }
}

/// Consumer half, owned by the persistence writer.
#[derive(Debug)]
pub struct TelemetryReceiver {
    rx: Receiver<RecordBatch>,
}

impl TelemetryReceiver {
    /// Blocks for the next batch. `Ok(None)` means end-of-stream.
    pub fn next_batch(&self) -> Result<Option<RecordBatch>, TelemetryError> {
        match self.rx.recv() {
            Ok(batch) if batch.is_empty() => Ok(None),
            Ok(batch) => Ok(Some(batch)),
            Err(_) => Err(TelemetryError::Disconnected),
        }
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}
