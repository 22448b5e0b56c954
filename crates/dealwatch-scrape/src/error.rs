//! Fetch error taxonomy.

use thiserror::Error;

/// Typed failure of a fetch operation.
///
/// Every failure crosses the fetcher boundary as one of these variants;
/// nothing panics past it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Upstream signalled we are sending too fast (HTTP 429).
    #[error("Upstream throttled the request")]
    Throttled,

    /// Upstream temporarily unavailable (HTTP 503).
    #[error("Upstream unavailable")]
    Unavailable,

    /// Connection, DNS, or timeout failure below the HTTP layer.
    #[error("Network error: {0}")]
    Network(String),

    /// Any other non-2xx response; never retried.
    #[error("Unexpected status: {0}")]
    BadStatus(u16),
}

impl FetchError {
    /// Whether the fetcher should retry after this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Throttled | FetchError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(FetchError::Throttled.is_retryable());
        assert!(FetchError::Unavailable.is_retryable());
        assert!(!FetchError::BadStatus(404).is_retryable());
        assert!(!FetchError::Network("reset".to_string()).is_retryable());
    }
}
