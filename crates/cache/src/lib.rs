//! SQLite cache of remote content.
//!
//! This crate mirrors records owned by the remote content service into one
//! SQLite table per entity kind. The cache is not the source of truth; if the
//! database is deleted, a full resync rebuilds it.
//!
//! # Architecture
//! Each row holds the raw remote record verbatim as `content`, plus a few
//! scalar columns derived from it at write time so that filtering and sorting
//! never have to parse JSON:
//! - [`Repository`] is the write side. Upserts are a single atomic
//!   `INSERT .. ON CONFLICT` statement, and rows can be hidden or purged when
//!   they disappear remotely.
//! - [`translate`] turns a portable [`Query`](mirror_query::Query) into SQL
//!   against a table's whitelisted columns.
//! - [`Reader`] executes translated queries and maps cached content into
//!   domain records for a locale.

mod db;
pub mod error;
mod models;
mod reader;
mod repo;
pub mod schema;
mod translate;

pub use crate::db::Database;
pub use crate::models::{CachedRow, SINGLETON_ID};
pub use crate::reader::{Page, Reader};
pub use crate::repo::{Prune, Repository, SyncMark};
pub use crate::translate::{Param, SqlQuery, Translated, translate};
