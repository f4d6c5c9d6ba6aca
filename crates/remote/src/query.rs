//! Request parameters for listing a remote collection.

use crate::Collection;
use mirror_content::raw::Status;
use mirror_query::{Filter, FilterSet, Limit, Pagination, Sort};
use serde_json::{Value as Json, json};

/// What to ask the remote for when listing a collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemQuery {
    /// Field selection, including dotted paths into relations (`rarity.translations.*`).
    pub fields: Vec<String>,
    pub search: Option<String>,
    pub filter: FilterSet,
    pub sort: Vec<Sort>,
    pub pagination: Pagination,
    /// Per-relation options, e.g. `{"featured_packs": {"_filter": {...}}}`.
    pub deep: Option<Json>,
    pub total_count: bool,
    pub filter_count: bool,
}

impl ItemQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter.push(filter);
        self
    }

    /// Only records whose status is `published`.
    pub fn published(self) -> Self {
        self.filter(Filter::eq("status", Status::Published.as_str()))
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn limit(mut self, limit: Limit) -> Self {
        self.pagination.limit = limit;
        self
    }

    pub fn with_total_count(mut self) -> Self {
        self.total_count = true;
        self
    }

    /// Encode as query-string pairs, in the remote's own conventions.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if !self.fields.is_empty() {
            params.push(("fields", self.fields.join(",")));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            params.push(("search", search.to_string()));
        }
        if !self.sort.is_empty() {
            let sort: Vec<String> = self.sort.iter().map(ToString::to_string).collect();
            params.push(("sort", sort.join(",")));
        }
        // A limit of zero means "no limit given" remotely, not "no rows".
        if self.pagination.limit != Limit::Rows(0) {
            params.push(("limit", self.pagination.limit.as_raw().to_string()));
        }
        if let Some(offset) = self.pagination.offset.filter(|o| *o > 0) {
            params.push(("offset", offset.to_string()));
        }
        if let Some(page) = self.pagination.page.filter(|p| *p > 0) {
            params.push(("page", page.to_string()));
        }
        if !self.filter.is_empty() {
            params.push(("filter", self.filter.to_json().to_string()));
        }
        if let Some(deep) = &self.deep {
            params.push(("deep", deep.to_string()));
        }
        match (self.total_count, self.filter_count) {
            (true, true) => params.push(("meta", "*".to_string())),
            (true, false) => params.push(("meta", "total_count".to_string())),
            (false, true) => params.push(("meta", "filter_count".to_string())),
            (false, false) => {},
        }
        params
    }
}

// Field selections. Every relation a mapper reads must be expanded here, or
// the cached record will fail to map later.

const FILE: &[&str] = &["*"];
const TAGS: &[&str] = &["tags.*", "tags.tags_id.*", "tags.tags_id.translations.*"];
const RARITY: &[&str] = &["*", "translations.*", "image.*"];
const COLLECTIBLE: &[&str] = &[
    "*",
    "translations.*",
    "preview_image.*",
    "preview_video.*",
    "preview_audio.*",
    "asset_file.*",
    "rarity.*",
    "rarity.translations.*",
    "set.id",
    "set.collection",
];
const PACK: &[&str] = &[
    "*",
    "translations.*",
    "pack_image.*",
    "pack_banner.*",
    "additional_images.*",
    "additional_images.directus_files_id.*",
];

struct Fields(Vec<String>);

impl Fields {
    fn new() -> Self {
        Self(Vec::new())
    }

    fn with(mut self, prefix: &str, fields: &[&str]) -> Self {
        self.0.extend(fields.iter().map(|field| join(prefix, field)));
        self
    }

    fn collectible(self, prefix: &str) -> Self {
        self.with(prefix, COLLECTIBLE).with(prefix, TAGS)
    }

    fn pack(self, prefix: &str) -> Self {
        let templates = join(prefix, "nft_templates");
        self.with(prefix, PACK).with(prefix, TAGS).collectible(&templates)
    }
}

fn join(prefix: &str, field: &str) -> String {
    match prefix {
        "" => field.to_string(),
        prefix => format!("{prefix}.{field}"),
    }
}

fn published_only(relations: &[&str]) -> Json {
    let filter = json!({ "_filter": { "status": { "_eq": Status::Published.as_str() } } });
    Json::Object(relations.iter().map(|relation| ((*relation).to_string(), filter.clone())).collect())
}

/// The default listing query for a collection: which fields to select and
/// which embedded relations to restrict to published records.
///
/// Collection-level filters (publication status, keys) are left to the caller.
pub fn defaults(collection: Collection) -> ItemQuery {
    let (fields, deep) = match collection {
        Collection::PackTemplates => (Fields::new().pack(""), None),
        Collection::NftTemplates => (Fields::new().collectible(""), None),
        Collection::Collections => (
            Fields::new().with("", &["*", "translations.*", "collection_image.*", "reward_image.*"]).with(
                "sets",
                &["*", "translations.*"],
            ),
            None,
        ),
        Collection::Sets => (
            Fields::new().with("", &["*", "translations.*"]).with(
                "collection",
                &["*", "translations.*", "collection_image.*", "reward_image.*"],
            ),
            None,
        ),
        Collection::StaticPage => (Fields::new().with("", &["*", "translations.*"]).with("hero_banner", FILE), None),
        Collection::FrequentlyAskedQuestions | Collection::Tags | Collection::Countries => {
            (Fields::new().with("", &["*", "translations.*"]), None)
        },
        Collection::Languages => (Fields::new().with("", &["*"]), None),
        Collection::Rarities => (Fields::new().with("", RARITY), None),
        Collection::Application => (
            Fields::new().with("", &["id", "currency", "countries.*"]).with(
                "countries.countries_id",
                &["*", "translations.*"],
            ),
            None,
        ),
        Collection::Homepage => (
            Fields::new()
                .with("", &["id", "translations.*"])
                .with("hero_banner", FILE)
                .pack("hero_pack")
                .pack("featured_packs")
                .collectible("featured_nfts")
                .with("featured_faqs", &["*", "translations.*"])
                .with("featured_rarities", RARITY),
            Some(published_only(&["hero_pack", "featured_packs", "featured_nfts"])),
        ),
    };
    ItemQuery { fields: fields.0, deep, ..ItemQuery::default() }
}
