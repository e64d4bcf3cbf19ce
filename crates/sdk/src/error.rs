use thiserror::Error;

/// Errors raised while building a client.
#[derive(Debug, Error)]
pub enum SdkError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("url error: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failure of a single API call.
///
/// `code` is the HTTP status when the server answered, or `0` when the call
/// never produced a response (connect failure, timeout, broken body).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("api error (status {code}): {message}")]
pub struct ApiError {
    pub code: u16,
    pub message: String,
}

impl ApiError {
    pub const TRANSPORT_CODE: u16 = 0;

    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::status(Self::TRANSPORT_CODE, message)
    }

    pub fn is_transport(&self) -> bool {
        self.code == Self::TRANSPORT_CODE
    }
}
