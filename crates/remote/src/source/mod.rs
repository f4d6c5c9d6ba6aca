//! Remote source abstraction.
//!
//! This module defines the [`RemoteSource`] trait that provides a uniform
//! read-only interface over the remote content service. The sync engine only
//! ever talks to a source through this trait, so tests can swap the real
//! HTTP client for an in-memory one.

#[cfg(feature = "http")]
mod http;
#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "http")]
pub use self::http::HttpRemote;
#[cfg(feature = "mock")]
pub use self::mock::MockRemote;

use crate::error::Result;
use crate::{Collection, ItemQuery};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Counts the remote attaches to a listing when asked to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    /// Rows matching the filter.
    #[serde(default)]
    pub filter_count: Option<u64>,
    /// Rows in the whole collection.
    #[serde(default)]
    pub total_count: Option<u64>,
}

/// One page of raw records from the remote.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemsResponse {
    /// Raw records, exactly as the remote returned them. Singleton
    /// collections yield at most one.
    pub data: Vec<serde_json::Value>,
    pub meta: Option<Meta>,
}

impl ItemsResponse {
    pub fn first(&self) -> Option<&serde_json::Value> {
        self.data.first()
    }
}

/// Read access to the remote content service.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so a single source can be shared
/// (as a [`RemoteHandle`](crate::RemoteHandle)) between concurrent webhook
/// deliveries and scheduled resyncs.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// List records of a collection.
    ///
    /// Returns whatever the remote's filters let through; an empty `data`
    /// is not an error. Transport problems are reported as
    /// [`Network`](crate::error::ErrorKind::Network) and unsuccessful
    /// responses as [`Status`](crate::error::ErrorKind::Status). Nothing is
    /// retried here: retry policy belongs to whoever drives the sync.
    async fn fetch(&self, collection: Collection, query: &ItemQuery) -> Result<ItemsResponse>;
}
