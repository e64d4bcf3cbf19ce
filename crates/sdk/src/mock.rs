use crate::api::{ApiRequest, SkiersApi};
use crate::error::ApiError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

/// In-process stand-in for the resort API.
///
/// Sleeps for a fixed latency and answers 201 for writes and 200 for reads.
/// The first `fail_first` calls (across all threads) answer 500 instead.
#[derive(Debug, Default)]
pub struct MockSkiersClient {
    latency: Duration,
    fail_first: u64,
    calls: AtomicU64,
}

impl MockSkiersClient {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            fail_first: 0,
            calls: AtomicU64::new(0),
        }
    }

    pub fn failing_first(mut self, count: u64) -> Self {
        self.fail_first = count;
        self
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl SkiersApi for MockSkiersClient {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn submit(&self, request: &ApiRequest<'_>) -> Result<u16, ApiError> {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        if call < self.fail_first {
            return Err(ApiError::status(500, "injected failure"));
        }
        match request {
            ApiRequest::WriteLiftRide(_) => Ok(201),
            _ => Ok(200),
        }
    }
}
