//! Query Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A query error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for query parsing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The query description is malformed and must be corrected by the caller.
    #[display("invalid query for {field}: {reason}")]
    InvalidQuery { field: String, reason: &'static str },
}

impl ErrorKind {
    pub(crate) fn invalid(field: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidQuery { field: field.into(), reason }
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
