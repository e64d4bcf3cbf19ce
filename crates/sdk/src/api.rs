use crate::error::ApiError;
use serde::Serialize;
use skiload_types::{
    RequestKind, LIFT_RIDE_PATH, SKIER_DAY_VERTICAL_PATH, SKIER_RESORT_TOTALS_PATH,
};

/// Body of a lift-ride write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiftRide {
    #[serde(rename = "resortID")]
    pub resort_id: String,
    #[serde(rename = "dayID")]
    pub day_id: u32,
    #[serde(rename = "skierID")]
    pub skier_id: u32,
    pub time: u32,
    #[serde(rename = "liftID")]
    pub lift_id: u32,
}

impl LiftRide {
    /// Template with the fixed resort and day; the rest is filled per call.
    pub fn template(resort_id: impl Into<String>, day_id: u32) -> Self {
        Self {
            resort_id: resort_id.into(),
            day_id,
            skier_id: 0,
            time: 0,
            lift_id: 0,
        }
    }
}

/// The three calls the harness drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiRequest<'a> {
    WriteLiftRide(&'a LiftRide),
    SkierDayVertical {
        resort: &'a str,
        day: u32,
        skier_id: u32,
    },
    SkierResortTotals {
        skier_id: u32,
        resort: &'a str,
    },
}

impl ApiRequest<'_> {
    pub fn kind(&self) -> RequestKind {
        match self {
            ApiRequest::WriteLiftRide(_) => RequestKind::Write,
            ApiRequest::SkierDayVertical { .. } | ApiRequest::SkierResortTotals { .. } => {
                RequestKind::Read
            }
        }
    }

    /// Templated path recorded in statistics. Concrete ids are not part of
    /// it so that all calls to one endpoint share a key.
    pub fn path(&self) -> &'static str {
        match self {
            ApiRequest::WriteLiftRide(_) => LIFT_RIDE_PATH,
            ApiRequest::SkierDayVertical { .. } => SKIER_DAY_VERTICAL_PATH,
            ApiRequest::SkierResortTotals { .. } => SKIER_RESORT_TOTALS_PATH,
        }
    }
}

/// Anything that can carry a request to the ski resort API.
///
/// Implementations are shared by every worker thread of a run.
pub trait SkiersApi: Send + Sync {
    fn name(&self) -> &'static str;

    /// Performs the call and returns the response status.
    fn submit(&self, request: &ApiRequest<'_>) -> Result<u16, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_endpoints_are_distinguished_by_path() {
        let day = ApiRequest::SkierDayVertical {
            resort: "whistler",
            day: 1,
            skier_id: 7,
        };
        let totals = ApiRequest::SkierResortTotals {
            skier_id: 7,
            resort: "whistler",
        };
        assert_eq!(day.kind(), RequestKind::Read);
        assert_eq!(totals.kind(), RequestKind::Read);
        assert_ne!(day.path(), totals.path());
    }

    #[test]
    fn lift_ride_uses_api_field_names() {
        let mut ride = LiftRide::template("whistler", 3);
        ride.skier_id = 42;
        ride.time = 90;
        ride.lift_id = 12;
        let json = serde_json::to_value(&ride).unwrap();
        assert_eq!(json["resortID"], "whistler");
        assert_eq!(json["dayID"], 3);
        assert_eq!(json["skierID"], 42);
        assert_eq!(json["time"], 90);
        assert_eq!(json["liftID"], 12);
        assert_eq!(ApiRequest::WriteLiftRide(&ride).kind(), RequestKind::Write);
    }
}
