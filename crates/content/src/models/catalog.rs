use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagBase {
    pub slug: String,
    pub title: String,
}

/// The parts of a rarity embedded in a collectible.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RarityRef {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RarityBase {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectibleBase {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_video: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_audio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<CollectionBase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_id: Option<String>,
    pub template_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_editions: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rarity: Option<RarityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagBase>>,
}

/// What a customer earns for completing a collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub complete: String,
    pub prompt: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionBase {
    pub id: String,
    pub slug: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
    pub collectible_template_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<Reward>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionWithSets {
    #[serde(flatten)]
    pub collection: CollectionBase,
    pub sets: Vec<SetBase>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBase {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub collectible_template_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetWithCollection {
    #[serde(flatten)]
    pub set: SetBase,
    pub collection: CollectionBase,
}
