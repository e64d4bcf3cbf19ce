use serde::{Deserialize, Serialize};
use std::fmt;

/// Path of the lift-ride write endpoint.
pub const LIFT_RIDE_PATH: &str = "/skiers/liftrides";
/// Path of the per-day vertical read endpoint.
pub const SKIER_DAY_VERTICAL_PATH: &str = "/skiers/{resortID}/days/{dayID}/skiers/{skierID}";
/// Path of the resort-totals read endpoint.
pub const SKIER_RESORT_TOTALS_PATH: &str = "/skiers/{skierID}/vertical";

/// Kind of call a record describes. Persisted as the HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RequestKind {
    #[serde(rename = "POST")]
    Write,
    #[serde(rename = "GET")]
    Read,
}

impl RequestKind {
    pub fn method(&self) -> &'static str {
        match self {
            RequestKind::Write => "POST",
            RequestKind::Read => "GET",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

/// One measured call against the target API.
///
/// Field order and names match the persisted CSV layout, so the same type is
/// used for writing rows during the run and reading them back afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    #[serde(rename = "RequestType")]
    pub kind: RequestKind,
    #[serde(rename = "Path")]
    pub path: String,
    #[serde(rename = "StartTimestamp(ms)")]
    pub start_time_ms: i64,
    #[serde(rename = "Latency(ms)")]
    pub latency_ms: u64,
    #[serde(rename = "ResponseCode")]
    pub response_code: u16,
}

impl RequestRecord {
    pub fn new(
        kind: RequestKind,
        path: impl Into<String>,
        start_time_ms: i64,
        latency_ms: u64,
        response_code: u16,
    ) -> Self {
        Self {
            kind,
            path: path.into(),
            start_time_ms,
            latency_ms,
            response_code,
        }
    }

    /// Grouping key used by the statistics pipeline: `"<METHOD> <path>"`.
    pub fn endpoint_key(&self) -> String {
        format!("{} {}", self.kind.method(), self.path)
    }

    /// 2xx codes count as successes. Transport failures carry code 0.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.response_code)
    }
}

/// Milliseconds since the Unix epoch on the wall clock.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
