//! Content Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A content error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for content operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Required embedded data (usually translations) is missing or was fetched
    /// without expanding the relation. Fix the remote field selection.
    #[display("data integrity violation: {_0}")]
    DataIntegrity(#[error(not(source))] String),
    /// The record does not have the shape expected for its entity kind.
    #[display("invalid {_0} content")]
    InvalidContent(#[error(not(source))] String),
    #[display("unknown entity kind: {_0}")]
    UnknownKind(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(
            ErrorKind::DataIntegrity("pack p1 has no translations".to_string()).to_string(),
            "data integrity violation: pack p1 has no translations"
        );
        assert_eq!(ErrorKind::InvalidContent("pack-template".to_string()).to_string(), "invalid pack-template content");
    }

    #[test]
    fn error_kind_retryable() {
        assert!(!ErrorKind::DataIntegrity(String::new()).is_retryable());
        assert!(!ErrorKind::UnknownKind("widgets".to_string()).is_retryable());
    }
}
