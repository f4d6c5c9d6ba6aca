use super::{Collection, File, Set, Status, TemplateTag};
use crate::relation::{Key, Relation, RelationList};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CollectibleTranslation {
    #[serde(default)]
    pub languages_code: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

/// Satellite record: rarities are only ever seen embedded in collectible
/// templates and the homepage.
#[derive(Debug, Clone, Deserialize)]
pub struct Rarity {
    #[serde(default)]
    pub id: Option<Key>,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub image: Option<Relation<File>>,
    #[serde(default)]
    pub translations: Option<RelationList<RarityTranslation>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RarityTranslation {
    #[serde(default)]
    pub languages_code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectibleTemplate {
    pub id: Key,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub total_editions: Option<u32>,
    #[serde(default)]
    pub unique_code: Option<String>,
    #[serde(default)]
    pub preview_image: Option<Relation<File>>,
    #[serde(default)]
    pub preview_video: Option<Relation<File>>,
    #[serde(default)]
    pub preview_audio: Option<Relation<File>>,
    #[serde(default)]
    pub asset_file: Option<Relation<File>>,
    #[serde(default)]
    pub rarity: Option<Relation<Rarity>>,
    /// Direct parent collection; takes precedence over the set's collection.
    #[serde(default)]
    pub collection: Option<Relation<Collection>>,
    #[serde(default)]
    pub set: Option<Relation<Set>>,
    #[serde(default)]
    pub translations: Option<RelationList<CollectibleTranslation>>,
    #[serde(default)]
    pub tags: Option<RelationList<TemplateTag>>,
}

impl CollectibleTemplate {
    pub fn set_id(&self) -> Option<String> {
        self.set.as_ref().map(Relation::id)
    }

    /// The parent collection, preferring the direct relation and only looking
    /// through the set when the direct one is absent.
    pub fn collection(&self) -> Option<&Relation<Collection>> {
        self.collection
            .as_ref()
            .or_else(|| self.set.as_ref().and_then(Relation::expanded).and_then(|set| set.collection.as_ref()))
    }

    pub fn collection_id(&self) -> Option<String> {
        self.collection().map(Relation::id)
    }

    pub fn tag_slugs(&self) -> Vec<String> {
        super::site::tag_slugs(self.tags.as_ref())
    }
}

super::translation!(CollectibleTranslation, RarityTranslation);
super::keyed!(CollectibleTemplate => id);
