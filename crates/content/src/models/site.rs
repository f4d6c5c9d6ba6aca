use super::{CollectibleBase, PackBase, RarityBase};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaqBase {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomepageBase {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hero_banner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hero_banner_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hero_banner_subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hero_pack_template: Option<PackBase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_packs_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_packs_subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_nfts_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_nfts_subtitle: Option<String>,
    pub featured_pack_templates: Vec<PackBase>,
    pub featured_nft_templates: Vec<CollectibleBase>,
    pub featured_faqs: Vec<FaqBase>,
    pub featured_rarities: Vec<RarityBase>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag_emoji: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageBase {
    pub id: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hero_banner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hero_banner_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hero_banner_subtitle: Option<String>,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<i64>,
}
