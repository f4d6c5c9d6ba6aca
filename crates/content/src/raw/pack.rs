use super::datetime;
use super::{CollectibleTemplate, File, Status, TemplateTag};
use crate::error::{Error, ErrorKind};
use crate::relation::{Key, Relation, RelationList};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackType {
    Auction,
    Free,
    Purchase,
    Redeem,
}

impl PackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auction => "auction",
            Self::Free => "free",
            Self::Purchase => "purchase",
            Self::Redeem => "redeem",
        }
    }

    /// Auctions are the only time-boxed pack type.
    pub fn is_time_boxed(&self) -> bool {
        matches!(self, Self::Auction)
    }
}

impl FromStr for PackType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "auction" => Self::Auction,
            "free" => Self::Free,
            "purchase" => Self::Purchase,
            "redeem" => Self::Redeem,
            _ => exn::bail!(ErrorKind::InvalidContent(format!("pack type {s:?}"))),
        })
    }
}

impl Display for PackType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// How collectibles are spread across the packs generated from a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distribution {
    #[serde(rename = "one-of-each")]
    OneOfEach,
    #[serde(rename = "random")]
    Random,
}

/// The order collectibles are revealed in when a pack is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    Match,
    Random,
}

/// Junction row between a pack template and one of its extra images.
#[derive(Debug, Clone, Deserialize)]
pub struct PackFile {
    pub id: Key,
    #[serde(default)]
    pub directus_files_id: Option<Relation<File>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackTranslation {
    #[serde(default)]
    pub languages_code: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackTemplate {
    pub id: Key,
    #[serde(default)]
    pub status: Option<Status>,
    pub slug: String,
    #[serde(rename = "type")]
    pub pack_type: PackType,
    #[serde(default)]
    pub price: Option<i64>,
    #[serde(default, deserialize_with = "datetime::option")]
    pub released_at: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "datetime::option")]
    pub auction_until: Option<OffsetDateTime>,
    #[serde(default)]
    pub allow_bid_expiration: bool,
    #[serde(default)]
    pub one_pack_per_customer: bool,
    #[serde(default)]
    pub show_nfts: bool,
    #[serde(default)]
    pub nft_distribution: Option<Distribution>,
    #[serde(default)]
    pub nft_order: Option<Order>,
    #[serde(default)]
    pub nfts_per_pack: Option<u32>,
    #[serde(default)]
    pub pack_image: Option<Relation<File>>,
    #[serde(default)]
    pub pack_banner: Option<Relation<File>>,
    #[serde(default)]
    pub additional_images: Option<RelationList<PackFile>>,
    #[serde(default)]
    pub nft_templates: Option<RelationList<CollectibleTemplate>>,
    #[serde(default)]
    pub translations: Option<RelationList<PackTranslation>>,
    #[serde(default)]
    pub tags: Option<RelationList<TemplateTag>>,
}

impl PackTemplate {
    /// Slugs of the template's expanded tags.
    pub fn tag_slugs(&self) -> Vec<String> {
        super::site::tag_slugs(self.tags.as_ref())
    }
}

super::translation!(PackTranslation);
super::keyed!(PackTemplate => id, PackFile => id);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn test_deserialize_pack_template() {
        let pack: PackTemplate = serde_json::from_value(json!({
            "id": "p1",
            "status": "published",
            "slug": "winter-drop",
            "type": "auction",
            "price": 1500,
            "released_at": "2024-01-01T10:00:00",
            "auction_until": "2024-01-02T10:00:00+00:00",
            "nft_distribution": "one-of-each",
            "nft_order": "match",
            "nfts_per_pack": 3,
            "pack_image": { "id": "f1", "storage": "local", "filename_disk": "f1.png" },
            "nft_templates": ["c1", "c2"],
            "translations": [{ "languages_code": "en-UK", "title": "Winter" }],
            "tags": [{ "tags_id": "t1" }],
        }))
        .unwrap();
        assert_eq!(pack.pack_type, PackType::Auction);
        assert_eq!(pack.released_at, Some(datetime!(2024-01-01 10:00:00 UTC)));
        assert_eq!(pack.nft_distribution, Some(Distribution::OneOfEach));
        assert!(pack.pack_image.as_ref().and_then(Relation::expanded).is_some());
        assert_eq!(pack.nft_templates.map(|list| list.ids()), Some(vec!["c1".to_string(), "c2".to_string()]));
        assert!(!pack.show_nfts);
    }

    #[test]
    fn test_null_dates() {
        let pack: PackTemplate =
            serde_json::from_value(json!({ "id": "p1", "slug": "s", "type": "free", "released_at": null })).unwrap();
        assert_eq!(pack.released_at, None);
        assert_eq!(pack.auction_until, None);
    }

    #[test]
    fn test_pack_type_from_str() {
        assert_eq!("Auction".parse::<PackType>().unwrap(), PackType::Auction);
        assert!("raffle".parse::<PackType>().is_err());
    }
}
