//! Stable, caller-facing domain records.
//!
//! Everything here serializes as camelCase JSON with absent optionals
//! omitted, and is produced exclusively by [`Mapper`](crate::Mapper).

mod catalog;
mod pack;
mod site;

pub use self::catalog::{
    CollectibleBase, CollectionBase, CollectionWithSets, RarityBase, RarityRef, Reward, SetBase, SetWithCollection,
    TagBase,
};
pub use self::pack::{PackBase, PackConfig, PackStatus};
pub use self::site::{Country, FaqBase, HomepageBase, Language, PageBase};
