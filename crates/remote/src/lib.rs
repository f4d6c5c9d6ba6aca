//! Fetch interface to the remote content service.
//!
//! The mirror never writes to the remote. Everything it needs is a filtered
//! listing of one collection, described by an [`ItemQuery`] and answered with
//! an [`ItemsResponse`] of raw JSON records. [`RemoteSource`] is the seam:
//!
//! - `HttpRemote` (feature `http`) talks to the real service.
//! - `MockRemote` (feature `mock`) serves records from memory for tests.

mod collection;
pub mod error;
mod query;
mod source;

pub use crate::collection::Collection;
pub use crate::query::{ItemQuery, defaults};
#[cfg(feature = "http")]
pub use crate::source::HttpRemote;
#[cfg(feature = "mock")]
pub use crate::source::MockRemote;
pub use crate::source::{ItemsResponse, Meta, RemoteSource};

use std::sync::Arc;

pub type RemoteHandle = Arc<dyn RemoteSource + Send + Sync>;
