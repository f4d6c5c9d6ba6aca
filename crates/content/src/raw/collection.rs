use super::{CollectibleTemplate, File, Status};
use crate::relation::{Key, Relation, RelationList};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionTranslation {
    #[serde(default)]
    pub languages_code: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    pub reward_prompt: Option<String>,
    #[serde(default)]
    pub reward_complete: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Collection {
    pub id: Key,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub sort: Option<i64>,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub collection_image: Option<Relation<File>>,
    #[serde(default)]
    pub reward_image: Option<Relation<File>>,
    #[serde(default)]
    pub sets: Option<RelationList<Set>>,
    #[serde(default)]
    pub nft_templates: Option<RelationList<CollectibleTemplate>>,
    #[serde(default)]
    pub translations: Option<RelationList<CollectionTranslation>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetTranslation {
    #[serde(default)]
    pub languages_code: Option<String>,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Set {
    pub id: Key,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub sort: Option<i64>,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub collection: Option<Relation<Collection>>,
    #[serde(default)]
    pub nft_templates: Option<RelationList<CollectibleTemplate>>,
    #[serde(default)]
    pub translations: Option<RelationList<SetTranslation>>,
}

impl Set {
    pub fn collection_id(&self) -> Option<String> {
        self.collection.as_ref().map(Relation::id)
    }
}

super::translation!(CollectionTranslation, SetTranslation);
super::keyed!(Collection => id, Set => id);
