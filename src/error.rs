//! CLI Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A command error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for commands.
pub type Result<T> = std::result::Result<T, Error>;

/// Which part of a command failed. The cause is always a child in the tree.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("configuration error")]
    Config,
    #[display("cache error")]
    Cache,
    #[display("remote error")]
    Remote,
    #[display("sync failed")]
    Sync,
    /// Input given on the command line (or stdin) couldn't be used.
    #[display("invalid input: {_0}")]
    Input(#[error(not(source))] String),
}
