//! Upstream error types.

use axum::http::StatusCode;
use thiserror::Error;

/// Error returned by the fetch client and everything built on it.
///
/// `Clone` so that a single failure can be handed to every caller waiting
/// on a deduplicated request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The target was not an absolute http(s) URL. No I/O happened.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The caller supplied an argument that can never succeed upstream.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Connection, TLS or timeout failure after all attempts.
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream answered with a non-success status.
    #[error("Upstream returned {status}: {message}")]
    Status { status: u16, message: String },

    /// A GraphQL response carried errors.
    #[error("GraphQL error: {0}")]
    GraphQl(String),

    /// The body could not be decoded.
    #[error("Failed to decode upstream response: {0}")]
    Decode(String),

    /// The task executing the request failed.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FetchError {
    /// True when the upstream is throttling us.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            FetchError::Status { status, message } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16()
                    || message.to_ascii_lowercase().contains("rate limit")
            }
            _ => false,
        }
    }

    /// True when the upstream could not be reached or is failing.
    pub fn is_connectivity(&self) -> bool {
        match self {
            FetchError::Network(_) => true,
            FetchError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// True when the upstream reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Status { status, .. } if *status == StatusCode::NOT_FOUND.as_u16())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FetchError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            FetchError::Status {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

/// Convenience alias used throughout the upstream layer.
pub type FetchResult<T> = Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let limited = FetchError::Status { status: 429, message: "Too Many Requests".into() };
        assert!(limited.is_rate_limited());
        assert!(!limited.is_connectivity());

        let worded = FetchError::Status { status: 403, message: "Rate limit exceeded".into() };
        assert!(worded.is_rate_limited());

        let down = FetchError::Status { status: 503, message: "Service Unavailable".into() };
        assert!(down.is_connectivity());
        assert!(!down.is_rate_limited());

        assert!(FetchError::Network("connection refused".into()).is_connectivity());
        assert!(FetchError::Status { status: 404, message: String::new() }.is_not_found());
        assert!(!FetchError::Decode("eof".into()).is_connectivity());
    }
}
