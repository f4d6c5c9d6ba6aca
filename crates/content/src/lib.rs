//! Remote content shapes and the mappers that turn them into domain records.
//!
//! The remote content service hands out loosely-shaped JSON: relations may be
//! a bare identifier or a fully expanded object depending on which fields were
//! requested, and every human-readable string lives in a list of per-locale
//! translation records. This crate pins that looseness down at the boundary:
//!
//! - [`raw`] deserializes records, resolving "identifier or object" into an
//!   explicit [`Relation`] once.
//! - [`translation::resolve`] picks one locale's translation with an explicit
//!   fallback to the first entry.
//! - [`Mapper`] produces the stable, camelCase domain [`models`] that callers
//!   see, resolving media through a [`FileUrls`] implementation and computing
//!   time-derived [`PackStatus`](models::PackStatus) on every call.
//!
//! Nothing in this crate performs I/O.

pub mod error;
mod files;
mod kind;
mod mapper;
pub mod models;
pub mod raw;
mod relation;
pub mod translation;

pub use crate::files::{AssetUrls, FileUrls};
pub use crate::kind::EntityKind;
pub use crate::mapper::Mapper;
pub use crate::relation::{HasKey, Key, Relation, RelationList};

/// Locale used when the caller doesn't ask for one.
pub const DEFAULT_LOCALE: &str = "en-UK";
