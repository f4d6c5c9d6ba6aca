//! Remote Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A remote fetch error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for remote operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The request never produced a response (DNS, TLS, timeout, etc.)
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// The remote answered with a non-success HTTP status
    #[display("remote responded with status {_0}")]
    Status(#[error(not(source))] u16),
    /// The response body wasn't the expected `{ data, meta }` envelope
    #[display("invalid response from remote: {_0}")]
    InvalidResponse(#[error(not(source))] String),
    /// Not a collection the mirror knows how to fetch
    #[display("unknown remote collection: {_0}")]
    UnknownCollection(#[error(not(source))] String),
    /// The client couldn't be constructed from its settings
    #[display("invalid remote configuration: {_0}")]
    InvalidConfig(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status(status) => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::Network("connection reset".to_string()), true)]
    #[case(ErrorKind::Status(429), true)]
    #[case(ErrorKind::Status(503), true)]
    #[case(ErrorKind::Status(404), false)]
    #[case(ErrorKind::Status(401), false)]
    #[case(ErrorKind::InvalidResponse("data".to_string()), false)]
    #[case(ErrorKind::UnknownCollection("directus_users".to_string()), false)]
    fn test_retryable(#[case] kind: ErrorKind, #[case] expected: bool) {
        assert_eq!(kind.is_retryable(), expected);
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorKind::Status(502).to_string(), "remote responded with status 502");
        assert_eq!(ErrorKind::UnknownCollection("users".to_string()).to_string(), "unknown remote collection: users");
    }
}
