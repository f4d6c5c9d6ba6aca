mod content;
mod row;

pub use self::content::CachedRow;
pub(crate) use self::content::ContentRow;
pub(crate) use self::row::{EntityRow, Scalars};

/// Primary key of the single row stored for singleton kinds.
pub const SINGLETON_ID: &str = "singleton";
