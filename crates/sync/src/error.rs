//! Sync Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use mirror_cache::error::Error as CacheError;
use mirror_remote::error::Error as RemoteError;

/// A sync error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for sync and webhook operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a sync failure.
///
/// ### Dependency Errors
/// - [`ErrorKind::Remote`]
/// - [`ErrorKind::Cache`]
/// - [`ErrorKind::Content`]
///
/// ### Routing Errors
/// - [`ErrorKind::UnhandledOperation`]
/// - [`ErrorKind::UnhandledEntityType`]
/// - [`ErrorKind::InvalidNotification`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A fetch from the remote content service failed. Never retried here.
    #[display("remote fetch failed")]
    Remote { retryable: bool },
    /// Writing to (or reading from) the cache failed.
    #[display("cache update failed")]
    Cache { retryable: bool },
    /// A fetched record couldn't be interpreted while following its relations.
    #[display("invalid remote record: {_0}")]
    Content(#[error(not(source))] String),
    /// The event (or a delete under the `unhandled` policy) isn't supported.
    #[display("unhandled operation: {_0}")]
    UnhandledOperation(#[error(not(source))] String),
    /// The notification names a collection the mirror doesn't track.
    #[display("unhandled entity type: {_0}")]
    UnhandledEntityType(#[error(not(source))] String),
    /// The notification is missing what its collection needs (usually keys).
    #[display("invalid notification: {_0}")]
    InvalidNotification(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Remote { retryable } | Self::Cache { retryable } => *retryable,
            _ => false,
        }
    }
}

/// Raise remote failures as [`ErrorKind::Remote`], keeping the remote error
/// (and whether it was transient) in the tree.
pub(crate) trait RemoteResultExt<T> {
    fn or_remote(self) -> Result<T>;
}

impl<T> RemoteResultExt<T> for std::result::Result<T, RemoteError> {
    fn or_remote(self) -> Result<T> {
        self.map_err(|err| {
            let retryable = err.is_retryable();
            err.raise(ErrorKind::Remote { retryable })
        })
    }
}

/// Raise cache failures as [`ErrorKind::Cache`].
pub(crate) trait CacheResultExt<T> {
    fn or_cache(self) -> Result<T>;
}

impl<T> CacheResultExt<T> for std::result::Result<T, CacheError> {
    fn or_cache(self) -> Result<T> {
        self.map_err(|err| {
            let retryable = err.is_retryable();
            err.raise(ErrorKind::Cache { retryable })
        })
    }
}
