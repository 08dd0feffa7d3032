use reqwest::StatusCode;
use thiserror::Error;

/// Longest slice of an error response body carried into messages.
const ERROR_BODY_LIMIT: usize = 200;

/// Failure of a call to the Mealie API.
///
/// `Display` is the short, credential-free message shown to users.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Unsupported method: {0}")]
    UnsupportedMethod(reqwest::Method),
    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("Request failed: {0}")]
    Request(String),
    #[error("failed to parse response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(status: StatusCode, body: &[u8]) -> Self {
        let text = String::from_utf8_lossy(body);
        Self::Status {
            status,
            body: text.chars().take(ERROR_BODY_LIMIT).collect(),
        }
    }

    /// Transport failure; the request URL is stripped from the message.
    pub fn transport(err: reqwest::Error) -> Self {
        Self::Request(err.without_url().to_string())
    }

    pub fn decode(err: &serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }

    /// Connection failures and server-side (5xx) errors may succeed on retry;
    /// client errors and malformed bodies will not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Status { status, .. } => status.is_server_error(),
            Self::Url(_) | Self::UnsupportedMethod(_) | Self::Decode(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        let err = ApiError::status(StatusCode::BAD_GATEWAY, b"upstream down");
        assert!(err.is_transient());
        assert_eq!(err.to_string(), "HTTP 502 Bad Gateway: upstream down");
    }

    #[test]
    fn client_errors_are_not_transient() {
        let err = ApiError::status(StatusCode::NOT_FOUND, b"");
        assert!(!err.is_transient());
        assert!(!ApiError::Decode("eof".into()).is_transient());
        assert!(ApiError::Request("connection refused".into()).is_transient());
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(1000);
        match ApiError::status(StatusCode::INTERNAL_SERVER_ERROR, body.as_bytes()) {
            ApiError::Status { body, .. } => assert_eq!(body.len(), 200),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
