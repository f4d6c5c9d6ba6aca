//! Records exactly as the remote content service returns them.
//!
//! Field names follow the remote schema (snake_case). Relations are typed as
//! [`Relation`]/[`RelationList`] so that "bare identifier or expanded record"
//! is decided once here, and everything downstream matches on it.
//!
//! [`Relation`]: crate::Relation
//! [`RelationList`]: crate::RelationList

macro_rules! translation {
    ($($name:ident),+ $(,)?) => {
        $(
            impl $crate::translation::Translation for $name {
                fn locale(&self) -> Option<&str> {
                    self.languages_code.as_deref()
                }
            }
        )+
    };
}

macro_rules! keyed {
    ($($name:ident => $field:ident),+ $(,)?) => {
        $(
            impl $crate::relation::HasKey for $name {
                fn key(&self) -> &$crate::relation::Key {
                    &self.$field
                }
            }
        )+
    };
}

pub(crate) use {keyed, translation};

mod collectible;
mod collection;
mod file;
mod pack;
mod site;

pub use self::collectible::{CollectibleTemplate, CollectibleTranslation, Rarity, RarityTranslation};
pub use self::collection::{Collection, CollectionTranslation, Set, SetTranslation};
pub use self::file::File;
pub use self::pack::{Distribution, Order, PackFile, PackTemplate, PackTranslation, PackType};
pub use self::site::{
    Application, Country, CountryDetail, CountryTranslation, Faq, FaqTranslation, Homepage, HomepageTranslation,
    Language, Page, PageTranslation, Tag, TagTranslation, TemplateTag,
};

use crate::error::{ErrorKind, Result};
use crate::kind::EntityKind;
use exn::ResultExt;
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Publication state of records in collections that carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Draft,
    Published,
    Archived,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }
}

/// Deserialize a raw record of the given kind.
pub fn parse<T: DeserializeOwned>(kind: EntityKind, value: &serde_json::Value) -> Result<T> {
    T::deserialize(value).or_raise(|| ErrorKind::InvalidContent(kind.to_string()))
}

/// Optional timestamps in any shape the remote service emits.
pub(crate) mod datetime {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};
    use time::OffsetDateTime;

    pub fn option<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(text) if text.trim().is_empty() => Ok(None),
            Some(text) => mirror_query::timestamp::parse(&text)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("unrecognised timestamp: {text}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_reports_kind() {
        let err = parse::<PackTemplate>(EntityKind::PackTemplate, &json!({ "slug": 5 })).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidContent(kind) if kind == "pack-template"));
    }

    #[test]
    fn test_status() {
        let status: Status = serde_json::from_value(json!("published")).unwrap();
        assert_eq!(status, Status::Published);
        assert_eq!(status.as_str(), "published");
    }
}
