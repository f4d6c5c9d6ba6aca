//! Portable query descriptions.
//!
//! A [`Query`] describes *what* a caller wants from a collection of cached
//! entities (a filter tree, a sort order, a page window and whether a total
//! count is needed) without knowing anything about how or where those
//! entities are stored. The cache crate translates it into SQL; the remote
//! crate encodes the same filter tree into request parameters.
//!
//! The wire format follows the remote content service's convention:
//!
//! ```json
//! {
//!     "filter": { "type": { "_eq": "auction" }, "auctionUntil": { "_gt": "2024-01-01T00:00:00Z" } },
//!     "sort": ["-releasedAt", { "field": "slug", "order": "asc" }],
//!     "page": 2,
//!     "limit": 10,
//!     "totalCount": true
//! }
//! ```

pub mod error;
mod filter;
mod page;
mod query;
mod sort;
pub mod timestamp;
mod value;

pub use crate::filter::{Condition, Filter, FilterSet};
pub use crate::page::{Limit, Pagination};
pub use crate::query::Query;
pub use crate::sort::{Direction, Sort};
pub use crate::value::Value;
