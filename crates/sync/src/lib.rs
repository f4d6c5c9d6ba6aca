//! Keeping the content cache in step with the remote content service.
//!
//! The [`SyncEngine`] is the cache's only writer. It is driven two ways:
//! by schedule ([`SyncEngine::sync_everything`]) and by change notifications
//! from the remote, which [`webhook::route`] turns into a [`Plan`] of
//! incremental syncs, resyncs and deletes. What happens to records the remote
//! deletes or unpublishes is configured by a [`SyncPolicy`].

mod engine;
pub mod error;
mod policy;
pub mod webhook;

pub use crate::engine::{Change, Resync, SyncEngine};
pub use crate::policy::{OnDelete, OnUnpublish, SyncPolicy};
pub use crate::webhook::{Notification, Outcome, Plan, Report, Step, handle, route};
