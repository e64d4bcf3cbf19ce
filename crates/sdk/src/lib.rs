//! Client side of the ski resort API as seen by the load generator.
//!
//! Workers only depend on the [`SkiersApi`] capability; [`HttpSkiersClient`]
//! talks to a real server and [`MockSkiersClient`] answers in-process.

mod api;
mod error;
mod http;
mod mock;

pub use crate::api::{ApiRequest, LiftRide, SkiersApi};
pub use crate::error::{ApiError, SdkError};
pub use crate::http::HttpSkiersClient;
pub use crate::mock::MockSkiersClient;
