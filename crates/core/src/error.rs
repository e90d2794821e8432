//! Error types for venue interactions.
//!
//! Every variant is recoverable from the engine's point of view: a failed
//! venue call produces a failed tick with no state transition, and the
//! caller is free to tick again.

use thiserror::Error;

/// Errors that can occur when talking to a market venue.
#[derive(Debug, Error)]
pub enum VenueError {
    /// Network error.
    #[error("network error: {0}")]
    Network(String),

    /// Request timeout.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// API request failed.
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Error message from the venue.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimit {
        /// Seconds to wait before retry.
        retry_after_secs: u64,
    },

    /// Authentication failed.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Order signing failed.
    #[error("signing error: {0}")]
    Signing(String),

    /// Invalid order parameters.
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    /// Order rejected by the venue.
    #[error("order rejected: {0}")]
    OrderRejected(String),

    /// Venue returned unusable market data (e.g. an empty order book).
    #[error("market data error: {0}")]
    MarketData(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl VenueError {
    /// Creates an API error from status code and message.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a rate limit error.
    #[must_use]
    pub fn rate_limit(retry_after_secs: u64) -> Self {
        Self::RateLimit { retry_after_secs }
    }

    /// Returns true if the error indicates the request may succeed if retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::RateLimit { .. } => true,
            Self::Api { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }

    /// Returns the suggested retry delay in seconds, if applicable.
    #[must_use]
    pub fn retry_delay_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimit { retry_after_secs } => Some(*retry_after_secs),
            Self::Network(_) | Self::Timeout(_) => Some(1),
            Self::Api { status_code, .. } if *status_code >= 500 => Some(2),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for VenueError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_construction() {
        let err = VenueError::api(400, "bad request");
        assert!(matches!(
            err,
            VenueError::Api {
                status_code: 400,
                ..
            }
        ));
        assert!(err.to_string().contains("bad request"));
    }

    #[test]
    fn test_network_error_is_transient() {
        let err = VenueError::Network("connection refused".to_string());
        assert!(err.is_transient());
        assert_eq!(err.retry_delay_secs(), Some(1));
    }

    #[test]
    fn test_server_error_is_transient() {
        let err = VenueError::api(503, "service unavailable");
        assert!(err.is_transient());
        assert_eq!(err.retry_delay_secs(), Some(2));
    }

    #[test]
    fn test_client_error_is_not_transient() {
        let err = VenueError::api(400, "bad request");
        assert!(!err.is_transient());
        assert_eq!(err.retry_delay_secs(), None);
    }

    #[test]
    fn test_rate_limit_retry_delay() {
        let err = VenueError::rate_limit(30);
        assert!(err.is_transient());
        assert_eq!(err.retry_delay_secs(), Some(30));
    }

    #[test]
    fn test_rejection_is_not_transient() {
        let err = VenueError::OrderRejected("insufficient balance".to_string());
        assert!(!err.is_transient());
    }
}
