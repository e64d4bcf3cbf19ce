use crate::api::{ApiRequest, SkiersApi};
use crate::error::{ApiError, SdkError};
use reqwest::blocking::{Client, Response};
use std::time::Duration;
use url::Url;

/// Blocking HTTP client for the ski resort API.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct HttpSkiersClient {
    base_url: Url,
    http: Client,
}

impl HttpSkiersClient {
    /// Create a client for `base_url` (e.g. `http://localhost:8080/skiapi`).
    pub fn new(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self, SdkError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()?;
        Self::with_http_client(base_url, http)
    }

    /// Use an existing reqwest client (custom TLS, proxies, pool sizing).
    pub fn with_http_client(base_url: impl AsRef<str>, http: Client) -> Result<Self, SdkError> {
        let url = Url::parse(base_url.as_ref())?;
        if url.cannot_be_a_base() {
            return Err(SdkError::InvalidBaseUrl(base_url.as_ref().to_string()));
        }
        Ok(Self {
            base_url: url,
            http,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Concrete URL for `request` under the base path.
    pub fn url_for(&self, request: &ApiRequest<'_>) -> Url {
        let day;
        let skier;
        let segments: Vec<&str> = match request {
            ApiRequest::WriteLiftRide(_) => vec!["skiers", "liftrides"],
            ApiRequest::SkierDayVertical {
                resort,
                day: day_id,
                skier_id,
            } => {
                day = day_id.to_string();
                skier = skier_id.to_string();
                vec!["skiers", *resort, "days", day.as_str(), "skiers", skier.as_str()]
            }
            ApiRequest::SkierResortTotals { skier_id, .. } => {
                skier = skier_id.to_string();
                vec!["skiers", skier.as_str(), "vertical"]
            }
        };

        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if let ApiRequest::SkierResortTotals { resort, .. } = request {
            url.query_pairs_mut().append_pair("resort", resort);
        }
        url
    }

    fn finish(response: Response) -> Result<u16, ApiError> {
        let status = response.status();
        if status.is_success() {
            // Drain the body so the connection goes back to the pool.
            response
                .bytes()
                .map_err(|err| ApiError::transport(format!("reading response body: {err}")))?;
            return Ok(status.as_u16());
        }
        let body = response.text().unwrap_or_default();
        Err(ApiError::status(status.as_u16(), body))
    }
}

impl SkiersApi for HttpSkiersClient {
    fn name(&self) -> &'static str {
        "http"
    }

    fn submit(&self, request: &ApiRequest<'_>) -> Result<u16, ApiError> {
        let url = self.url_for(request);
        let sent = match request {
            ApiRequest::WriteLiftRide(ride) => self.http.post(url).json(ride).send(),
            ApiRequest::SkierDayVertical { .. } | ApiRequest::SkierResortTotals { .. } => {
                self.http.get(url).send()
            }
        };
        match sent {
            Ok(response) => Self::finish(response),
            Err(err) => Err(ApiError {
                code: err.status().map(|s| s.as_u16()).unwrap_or(ApiError::TRANSPORT_CODE),
                message: err.to_string(),
            }),
        }
    }
}
