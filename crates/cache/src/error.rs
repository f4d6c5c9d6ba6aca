//! Cache Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use exn::ResultExt;

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("database error")]
    Database,
    /// SQLite was locked by another writer for longer than the busy timeout,
    /// or the pool ran out of connections.
    #[display("database busy")]
    Busy,
    #[display("database migration error")]
    Migration,
    /// A record (or a stored row) could not be interpreted.
    #[display("invalid cache data: {_0}")]
    InvalidData(#[error(not(source))] String),
    /// The query description can't be translated without widening it.
    #[display("invalid query for {field}: {reason}")]
    InvalidQuery { field: String, reason: &'static str },
    /// Cached content was synced without the relations needed to map it.
    #[display("data integrity violation in cached {_0}")]
    DataIntegrity(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy)
    }

    pub(crate) fn invalid_query(field: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidQuery { field: field.into(), reason }
    }
}

fn is_busy(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::PoolTimedOut => true,
        // SQLITE_BUSY (5) and SQLITE_LOCKED (6), including extended codes.
        sqlx::Error::Database(error) => error
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .is_some_and(|code| matches!(code & 0xff, 5 | 6)),
        _ => false,
    }
}

/// Raise database failures as [`ErrorKind::Busy`] or [`ErrorKind::Database`].
pub(crate) trait DatabaseResultExt<T> {
    fn or_database(self) -> Result<T>;
}

impl<T> DatabaseResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn or_database(self) -> Result<T> {
        let busy = self.as_ref().err().is_some_and(is_busy);
        self.or_raise(|| if busy { ErrorKind::Busy } else { ErrorKind::Database })
    }
}
