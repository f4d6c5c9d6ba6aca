use super::{CollectibleTemplate, File, PackTemplate, Rarity, Status};
use crate::relation::{Key, Relation, RelationList};
use serde::Deserialize;

// ====================================================================
// Pages & FAQs
// ====================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct PageTranslation {
    #[serde(default)]
    pub languages_code: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub hero_banner_title: Option<String>,
    #[serde(default)]
    pub hero_banner_subtitle: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: Key,
    pub slug: String,
    #[serde(default)]
    pub hero_banner: Option<Relation<File>>,
    #[serde(default)]
    pub translations: Option<RelationList<PageTranslation>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FaqTranslation {
    #[serde(default)]
    pub languages_code: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Faq {
    pub id: Key,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub sort: Option<i64>,
    #[serde(default)]
    pub translations: Option<RelationList<FaqTranslation>>,
}

// ====================================================================
// Singletons
// ====================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct HomepageTranslation {
    #[serde(default)]
    pub languages_code: Option<String>,
    #[serde(default)]
    pub featured_packs_title: Option<String>,
    #[serde(default)]
    pub featured_packs_subtitle: Option<String>,
    #[serde(default)]
    pub featured_nfts_title: Option<String>,
    #[serde(default)]
    pub featured_nfts_subtitle: Option<String>,
    #[serde(default)]
    pub hero_banner_title: Option<String>,
    #[serde(default)]
    pub hero_banner_subtitle: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Homepage {
    #[serde(default)]
    pub id: Option<Key>,
    #[serde(default)]
    pub hero_banner: Option<Relation<File>>,
    #[serde(default)]
    pub hero_pack: Option<Relation<PackTemplate>>,
    #[serde(default)]
    pub featured_packs: Option<RelationList<PackTemplate>>,
    #[serde(default)]
    pub featured_nfts: Option<RelationList<CollectibleTemplate>>,
    #[serde(default)]
    pub featured_faqs: Option<RelationList<Faq>>,
    #[serde(default)]
    pub featured_rarities: Option<RelationList<Rarity>>,
    #[serde(default)]
    pub translations: Option<RelationList<HomepageTranslation>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountryTranslation {
    #[serde(default)]
    pub languages_code: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountryDetail {
    pub code: String,
    #[serde(default)]
    pub flag_emoji: Option<String>,
    #[serde(default)]
    pub translations: Option<RelationList<CountryTranslation>>,
}

/// Junction row between the application and one supported country.
#[derive(Debug, Clone, Deserialize)]
pub struct Country {
    #[serde(default)]
    pub id: Option<Key>,
    #[serde(default, alias = "countries_code")]
    pub countries_id: Option<Relation<CountryDetail>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Application {
    #[serde(default)]
    pub id: Option<Key>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub countries: Option<RelationList<Country>>,
}

// ====================================================================
// Languages & Tags
// ====================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Language {
    pub code: Key,
    #[serde(default, alias = "name")]
    pub label: Option<String>,
    #[serde(default)]
    pub sort: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagTranslation {
    #[serde(default)]
    pub languages_code: Option<String>,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tag {
    pub id: Key,
    pub slug: String,
    #[serde(default)]
    pub translations: Option<RelationList<TagTranslation>>,
}

/// Junction row between a template and one of its tags.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateTag {
    #[serde(default)]
    pub id: Option<Key>,
    pub tags_id: Relation<Tag>,
}

super::translation!(PageTranslation, FaqTranslation, HomepageTranslation, CountryTranslation, TagTranslation);
super::keyed!(Page => id, Faq => id, Language => code, Tag => id);

/// Tag slugs of a template, skipping tags that weren't expanded.
pub(crate) fn tag_slugs(tags: Option<&RelationList<TemplateTag>>) -> Vec<String> {
    tags.map(|list| {
        list.expanded().filter_map(|tag| tag.tags_id.expanded()).map(|tag| tag.slug.clone()).collect()
    })
    .unwrap_or_default()
}
