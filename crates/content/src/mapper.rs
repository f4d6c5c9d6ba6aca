use crate::error::{ErrorKind, Result};
use crate::files::FileUrls;
use crate::models::{
    CollectibleBase, CollectionBase, CollectionWithSets, Country, FaqBase, HomepageBase, Language, PackBase,
    PackConfig, PackStatus, PageBase, RarityBase, RarityRef, Reward, SetBase, SetWithCollection, TagBase,
};
use crate::raw;
use crate::relation::{Relation, RelationList};
use crate::translation::resolve;
use time::OffsetDateTime;

/// Turns raw remote records into domain records for one locale.
///
/// A mapper is cheap to build; build one per request. `now` is captured at
/// construction so that every pack mapped in one response agrees on status.
#[derive(Clone, Copy)]
pub struct Mapper<'a> {
    locale: &'a str,
    files: &'a dyn FileUrls,
    now: OffsetDateTime,
}

impl<'a> Mapper<'a> {
    pub fn new(locale: &'a str, files: &'a dyn FileUrls) -> Self {
        Self { locale, files, now: OffsetDateTime::now_utc() }
    }

    /// Evaluate time-derived fields at `now` instead of the current time.
    pub fn at(mut self, now: OffsetDateTime) -> Self {
        self.now = now;
        self
    }

    pub fn locale(&self) -> &str {
        self.locale
    }

    pub fn now(&self) -> OffsetDateTime {
        self.now
    }

    // ====================================================================
    // Packs & Collectibles
    // ====================================================================

    pub fn pack(&self, pack: &raw::PackTemplate) -> Result<PackBase> {
        let translation = resolve(pack.translations.as_ref(), self.locale, || format!("pack {}", pack.id))?;
        let (collectible_template_ids, collectible_templates) = if pack.show_nfts {
            let templates = pack.nft_templates.as_ref();
            let ids = templates.map(RelationList::ids).unwrap_or_default();
            let mapped = templates
                .map(|list| list.expanded().map(|template| self.collectible(template)).collect::<Result<Vec<_>>>())
                .transpose()?
                .unwrap_or_default();
            (Some(ids), Some(mapped))
        } else {
            (None, None)
        };
        let additional_images = pack
            .additional_images
            .as_ref()
            .map(|list| {
                list.expanded()
                    .filter_map(|image| self.files.url_opt(image.directus_files_id.as_ref()))
                    .collect()
            })
            .unwrap_or_default();
        Ok(PackBase {
            additional_images,
            allow_bid_expiration: pack.allow_bid_expiration,
            auction_until: pack.auction_until,
            banner: self.files.url_opt(pack.pack_banner.as_ref()),
            body: translation.body.clone(),
            collectible_template_ids,
            collectible_templates,
            config: PackConfig {
                collectible_distribution: pack.nft_distribution,
                collectible_order: pack.nft_order,
                collectibles_per_pack: pack.nfts_per_pack,
            },
            image: self.files.url_opt(pack.pack_image.as_ref()),
            one_pack_per_customer: pack.one_pack_per_customer,
            nfts_per_pack: pack.nfts_per_pack,
            price: pack.price.unwrap_or(0),
            released_at: pack.released_at,
            show_nfts: pack.show_nfts,
            slug: pack.slug.clone(),
            status: PackStatus::at(pack.pack_type, pack.released_at, pack.auction_until, self.now),
            subtitle: translation.subtitle.clone(),
            template_id: pack.id.to_string(),
            title: translation.title.clone(),
            pack_type: pack.pack_type,
            tags: self.tags(pack.tags.as_ref())?,
        })
    }

    pub fn collectible(&self, template: &raw::CollectibleTemplate) -> Result<CollectibleBase> {
        let translation =
            resolve(template.translations.as_ref(), self.locale, || format!("collectible {}", template.id))?;
        let rarity = match &template.rarity {
            None => None,
            Some(Relation::Expanded(rarity)) => {
                let name = resolve(rarity.translations.as_ref(), self.locale, || format!("rarity {}", rarity.code))?;
                Some(RarityRef { code: rarity.code.clone(), color: rarity.color.clone(), name: name.name.clone() })
            },
            Some(Relation::Id(key)) => exn::bail!(ErrorKind::DataIntegrity(format!(
                "collectible {}: rarity {key} was not expanded",
                template.id
            ))),
        };
        // A collection selected only for its identifier is a reference, not a
        // record to map.
        let collection = match template.collection().and_then(Relation::expanded) {
            Some(collection) if collection.translations.is_some() => Some(self.collection(collection)?),
            _ => None,
        };
        Ok(CollectibleBase {
            body: translation.body.clone(),
            subtitle: translation.subtitle.clone(),
            title: translation.title.clone(),
            image: self.files.url_opt(template.preview_image.as_ref()),
            preview_video: self.files.url_opt(template.preview_video.as_ref()),
            preview_audio: self.files.url_opt(template.preview_audio.as_ref()),
            asset_file: self.files.url_opt(template.asset_file.as_ref()),
            collection_id: template.collection_id(),
            collection,
            set_id: template.set_id(),
            template_id: template.id.to_string(),
            total_editions: template.total_editions,
            unique_code: template.unique_code.clone(),
            rarity,
            tags: self.tags(template.tags.as_ref())?,
        })
    }

    pub fn rarity(&self, rarity: &raw::Rarity) -> Result<RarityBase> {
        let translation = resolve(rarity.translations.as_ref(), self.locale, || format!("rarity {}", rarity.code))?;
        Ok(RarityBase {
            code: rarity.code.clone(),
            color: rarity.color.clone(),
            description: translation.description.clone(),
            image: self.files.url_opt(rarity.image.as_ref()),
            name: translation.name.clone(),
        })
    }

    pub fn tag(&self, tag: &raw::Tag) -> Result<TagBase> {
        let translation = resolve(tag.translations.as_ref(), self.locale, || format!("tag {}", tag.slug))?;
        Ok(TagBase { slug: tag.slug.clone(), title: translation.title.clone() })
    }

    /// Unexpanded tags are skipped rather than failing the whole record.
    fn tags(&self, tags: Option<&RelationList<raw::TemplateTag>>) -> Result<Option<Vec<TagBase>>> {
        let Some(tags) = tags else {
            return Ok(None);
        };
        let mapped = tags
            .expanded()
            .filter_map(|junction| junction.tags_id.expanded())
            .map(|tag| self.tag(tag))
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(mapped))
    }

    // ====================================================================
    // Collections & Sets
    // ====================================================================

    pub fn collection(&self, collection: &raw::Collection) -> Result<CollectionBase> {
        let translation =
            resolve(collection.translations.as_ref(), self.locale, || format!("collection {}", collection.id))?;
        let reward_image = self.files.url_opt(collection.reward_image.as_ref());
        let reward = match (&translation.reward_complete, &translation.reward_prompt, reward_image) {
            (Some(complete), Some(prompt), Some(image)) => {
                Some(Reward { complete: complete.clone(), prompt: prompt.clone(), image })
            },
            _ => None,
        };
        Ok(CollectionBase {
            id: collection.id.to_string(),
            slug: collection.slug.clone(),
            name: translation.name.clone(),
            description: translation.description.clone(),
            metadata: translation.metadata.clone(),
            collectible_template_ids: collection.nft_templates.as_ref().map(RelationList::ids).unwrap_or_default(),
            image: self.files.url_opt(collection.collection_image.as_ref()),
            reward,
        })
    }

    /// Requires the collection's sets to have been expanded.
    pub fn collection_with_sets(&self, collection: &raw::Collection) -> Result<CollectionWithSets> {
        let base = self.collection(collection)?;
        let unexpanded = || ErrorKind::DataIntegrity(format!("collection {}: sets were not expanded", collection.id));
        let Some(RelationList::Items(sets)) = &collection.sets else {
            exn::bail!(unexpanded());
        };
        let sets = sets
            .iter()
            .map(|set| match set {
                Relation::Expanded(set) => self.set(set),
                Relation::Id(_) => exn::bail!(unexpanded()),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(CollectionWithSets { collection: base, sets })
    }

    pub fn set(&self, set: &raw::Set) -> Result<SetBase> {
        let translation = resolve(set.translations.as_ref(), self.locale, || format!("set {}", set.id))?;
        Ok(SetBase {
            id: set.id.to_string(),
            slug: set.slug.clone(),
            name: translation.name.clone(),
            collectible_template_ids: set.nft_templates.as_ref().map(RelationList::ids).unwrap_or_default(),
        })
    }

    /// Requires the set's collection to have been expanded.
    pub fn set_with_collection(&self, set: &raw::Set) -> Result<SetWithCollection> {
        let base = self.set(set)?;
        let Some(Relation::Expanded(collection)) = &set.collection else {
            exn::bail!(ErrorKind::DataIntegrity(format!("set {}: collection was not expanded", set.id)));
        };
        Ok(SetWithCollection { set: base, collection: self.collection(collection)? })
    }

    // ====================================================================
    // Site Content
    // ====================================================================

    /// Featured items that weren't expanded (typically because the remote
    /// filtered out unpublished ones) are skipped.
    pub fn homepage(&self, homepage: &raw::Homepage) -> Result<HomepageBase> {
        let translation = resolve(homepage.translations.as_ref(), self.locale, || "homepage".to_string())?;
        let hero_pack_template = homepage.hero_pack.as_ref().and_then(Relation::expanded).map(|pack| self.pack(pack));
        Ok(HomepageBase {
            hero_banner: self.files.url_opt(homepage.hero_banner.as_ref()),
            hero_banner_title: translation.hero_banner_title.clone(),
            hero_banner_subtitle: translation.hero_banner_subtitle.clone(),
            hero_pack_template: hero_pack_template.transpose()?,
            featured_packs_title: translation.featured_packs_title.clone(),
            featured_packs_subtitle: translation.featured_packs_subtitle.clone(),
            featured_nfts_title: translation.featured_nfts_title.clone(),
            featured_nfts_subtitle: translation.featured_nfts_subtitle.clone(),
            featured_pack_templates: map_expanded(homepage.featured_packs.as_ref(), |pack| self.pack(pack))?,
            featured_nft_templates: map_expanded(homepage.featured_nfts.as_ref(), |nft| self.collectible(nft))?,
            featured_faqs: map_expanded(homepage.featured_faqs.as_ref(), |faq| self.faq(faq))?,
            featured_rarities: map_expanded(homepage.featured_rarities.as_ref(), |rarity| self.rarity(rarity))?,
        })
    }

    pub fn faq(&self, faq: &raw::Faq) -> Result<FaqBase> {
        let translation = resolve(faq.translations.as_ref(), self.locale, || format!("faq {}", faq.id))?;
        Ok(FaqBase { key: faq.key.clone(), question: translation.question.clone(), answer: translation.answer.clone() })
    }

    /// Supported countries, sorted by their localized name.
    pub fn countries(&self, application: &raw::Application) -> Result<Vec<Country>> {
        let Some(countries) = &application.countries else {
            return Ok(Vec::new());
        };
        let mut mapped = countries
            .expanded()
            .filter_map(|junction| junction.countries_id.as_ref().and_then(Relation::expanded))
            .map(|country| -> Result<Country> {
                let translation =
                    resolve(country.translations.as_ref(), self.locale, || format!("country {}", country.code))?;
                Ok(Country {
                    code: country.code.clone(),
                    flag_emoji: country.flag_emoji.clone(),
                    name: translation.title.clone().unwrap_or_else(|| country.code.clone()),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        mapped.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(mapped)
    }

    pub fn page(&self, page: &raw::Page) -> Result<PageBase> {
        let translation = resolve(page.translations.as_ref(), self.locale, || format!("page {}", page.slug))?;
        Ok(PageBase {
            id: page.id.to_string(),
            slug: page.slug.clone(),
            hero_banner: self.files.url_opt(page.hero_banner.as_ref()),
            hero_banner_title: translation.hero_banner_title.clone(),
            hero_banner_subtitle: translation.hero_banner_subtitle.clone(),
            title: translation.title.clone(),
            body: translation.body.clone(),
        })
    }

    pub fn language(&self, language: &raw::Language) -> Language {
        Language { code: language.code.to_string(), label: language.label.clone(), sort: language.sort }
    }
}

fn map_expanded<T, U>(list: Option<&RelationList<T>>, map: impl Fn(&T) -> Result<U>) -> Result<Vec<U>> {
    list.map(|list| list.expanded().map(map).collect()).unwrap_or_else(|| Ok(Vec::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::AssetUrls;
    use crate::kind::EntityKind;
    use crate::raw::parse;
    use serde_json::json;
    use time::macros::datetime;
    use url::Url;

    const NOW: OffsetDateTime = datetime!(2024-06-01 12:00:00 UTC);

    fn urls() -> AssetUrls {
        AssetUrls::new(Url::parse("https://cms.example.com").unwrap()).with_cdn("https://cdn.example.com", "gcp")
    }

    fn collectible_json() -> serde_json::Value {
        json!({
            "id": "c1",
            "total_editions": 10,
            "unique_code": "ABC123",
            "preview_image": { "id": "img", "storage": "gcp", "filename_disk": "img.png" },
            "preview_video": null,
            "rarity": { "code": "rare", "color": "#f00", "translations": [{ "languages_code": "en-UK", "name": "Rare" }] },
            "translations": [
                { "languages_code": "fr-FR", "title": "Dragon (fr)" },
                { "languages_code": "en-UK", "title": "Dragon", "subtitle": "Fierce" },
            ],
            "collection": null,
            "set": { "id": "s1", "collection": { "id": "col1" } },
            "tags": [{ "id": 1, "tags_id": { "id": "t1", "slug": "fire", "translations": [{ "title": "Fire" }] } }],
        })
    }

    fn pack_json(show_nfts: bool) -> serde_json::Value {
        json!({
            "id": "p1",
            "slug": "dragon-pack",
            "type": "auction",
            "price": null,
            "released_at": "2024-06-01T11:00:00Z",
            "auction_until": "2024-06-01T13:00:00Z",
            "show_nfts": show_nfts,
            "nfts_per_pack": 1,
            "nft_distribution": "random",
            "nft_order": "random",
            "pack_image": "img-id",
            "additional_images": [{ "id": 1, "directus_files_id": "extra" }],
            "nft_templates": [collectible_json(), "c2"],
            "translations": [{ "languages_code": "en-UK", "title": "Dragons", "body": "Here be dragons" }],
        })
    }

    #[test]
    fn test_pack() {
        let files = urls();
        let mapper = Mapper::new("en-UK", &files).at(NOW);
        let raw: raw::PackTemplate = parse(EntityKind::PackTemplate, &pack_json(true)).unwrap();
        let pack = mapper.pack(&raw).unwrap();
        assert_eq!(pack.status, PackStatus::Active);
        assert_eq!(pack.price, 0);
        assert_eq!(pack.title, "Dragons");
        assert_eq!(pack.image.as_deref(), Some("https://cms.example.com/assets/img-id"));
        assert_eq!(pack.additional_images, vec!["https://cms.example.com/assets/extra".to_string()]);
        assert_eq!(pack.collectible_template_ids, Some(vec!["c1".to_string(), "c2".to_string()]));
        assert_eq!(pack.collectible_templates.as_ref().map(Vec::len), Some(1));
        assert_eq!(pack.template_id, "p1");
    }

    #[test]
    fn test_pack_hides_collectibles() {
        let files = urls();
        let mapper = Mapper::new("en-UK", &files).at(NOW);
        let raw: raw::PackTemplate = parse(EntityKind::PackTemplate, &pack_json(false)).unwrap();
        let pack = mapper.pack(&raw).unwrap();
        assert_eq!(pack.collectible_template_ids, None);
        assert_eq!(pack.collectible_templates, None);
        let json = serde_json::to_value(&pack).unwrap();
        assert!(json.get("collectibleTemplateIds").is_none());
        assert_eq!(json["status"], "Active");
        assert_eq!(json["releasedAt"], "2024-06-01T11:00:00Z");
        assert_eq!(json["config"]["collectibleDistribution"], "random");
    }

    #[test]
    fn test_pack_status_recomputed_per_mapper() {
        let files = urls();
        let raw: raw::PackTemplate = parse(EntityKind::PackTemplate, &pack_json(false)).unwrap();
        let later = Mapper::new("en-UK", &files).at(datetime!(2024-06-02 00:00:00 UTC));
        assert_eq!(later.pack(&raw).unwrap().status, PackStatus::Expired);
        let earlier = Mapper::new("en-UK", &files).at(datetime!(2024-05-01 00:00:00 UTC));
        assert_eq!(earlier.pack(&raw).unwrap().status, PackStatus::Upcoming);
    }

    #[test]
    fn test_pack_without_translations() {
        let files = urls();
        let mapper = Mapper::new("en-UK", &files);
        let raw: raw::PackTemplate =
            parse(EntityKind::PackTemplate, &json!({ "id": "p9", "slug": "s", "type": "free", "translations": [] }))
                .unwrap();
        let err = mapper.pack(&raw).unwrap_err();
        assert!(matches!(&*err, ErrorKind::DataIntegrity(message) if message == "pack p9 has no translations"));
    }

    #[test]
    fn test_collectible() {
        let files = urls();
        let mapper = Mapper::new("en-UK", &files);
        let raw: raw::CollectibleTemplate = parse(EntityKind::CollectibleTemplate, &collectible_json()).unwrap();
        let collectible = mapper.collectible(&raw).unwrap();
        assert_eq!(collectible.title, "Dragon");
        assert_eq!(collectible.subtitle.as_deref(), Some("Fierce"));
        assert_eq!(collectible.image.as_deref(), Some("https://cdn.example.com/img.png"));
        assert_eq!(collectible.preview_video, None);
        assert_eq!(collectible.collection_id.as_deref(), Some("col1"));
        assert_eq!(collectible.collection, None);
        assert_eq!(collectible.set_id.as_deref(), Some("s1"));
        assert_eq!(collectible.rarity.and_then(|rarity| rarity.name).as_deref(), Some("Rare"));
        assert_eq!(collectible.tags, Some(vec![TagBase { slug: "fire".to_string(), title: "Fire".to_string() }]));
    }

    #[test]
    fn test_collectible_unexpanded_rarity() {
        let files = urls();
        let mapper = Mapper::new("en-UK", &files);
        let mut json = collectible_json();
        json["rarity"] = json!("rare");
        let raw: raw::CollectibleTemplate = parse(EntityKind::CollectibleTemplate, &json).unwrap();
        let err = mapper.collectible(&raw).unwrap_err();
        assert!(matches!(&*err, ErrorKind::DataIntegrity(_)));
    }

    fn collection_json(sets: serde_json::Value) -> serde_json::Value {
        json!({
            "id": "col1",
            "slug": "dragons",
            "collection_image": "cover",
            "reward_image": "reward",
            "nft_templates": ["c1", { "id": "c2" }],
            "sets": sets,
            "translations": [{
                "languages_code": "en-UK",
                "name": "Dragons",
                "reward_prompt": "Collect them all",
                "reward_complete": "Well done",
            }],
        })
    }

    #[test]
    fn test_collection_with_sets() {
        let files = urls();
        let mapper = Mapper::new("en-UK", &files);
        let raw: raw::Collection = parse(
            EntityKind::Collection,
            &collection_json(json!([{ "id": "s1", "slug": "red", "nft_templates": ["c1"], "translations": [{ "name": "Red" }] }])),
        )
        .unwrap();
        let collection = mapper.collection_with_sets(&raw).unwrap();
        assert_eq!(collection.collection.collectible_template_ids, vec!["c1".to_string(), "c2".to_string()]);
        assert_eq!(
            collection.collection.reward,
            Some(Reward {
                complete: "Well done".to_string(),
                prompt: "Collect them all".to_string(),
                image: "https://cms.example.com/assets/reward".to_string(),
            })
        );
        assert_eq!(collection.sets.len(), 1);
        assert_eq!(collection.sets[0].name, "Red");
        let json = serde_json::to_value(&collection).unwrap();
        assert_eq!(json["slug"], "dragons");
        assert_eq!(json["sets"][0]["collectibleTemplateIds"][0], "c1");
    }

    #[test]
    fn test_collection_requires_expanded_sets() {
        let files = urls();
        let mapper = Mapper::new("en-UK", &files);
        let raw: raw::Collection = parse(EntityKind::Collection, &collection_json(json!(["s1"]))).unwrap();
        let err = mapper.collection_with_sets(&raw).unwrap_err();
        assert!(matches!(&*err, ErrorKind::DataIntegrity(message) if message.contains("sets were not expanded")));
        // The plain collection mapping doesn't care.
        assert!(mapper.collection(&raw).is_ok());
    }

    #[test]
    fn test_reward_requires_all_parts() {
        let files = urls();
        let mapper = Mapper::new("en-UK", &files);
        let mut json = collection_json(json!([]));
        json["reward_image"] = json!(null);
        let raw: raw::Collection = parse(EntityKind::Collection, &json).unwrap();
        assert_eq!(mapper.collection(&raw).unwrap().reward, None);
    }

    #[test]
    fn test_set_with_collection() {
        let files = urls();
        let mapper = Mapper::new("en-UK", &files);
        let expanded: raw::Set = parse(
            EntityKind::Set,
            &json!({ "id": "s1", "slug": "red", "collection": collection_json(json!([])), "translations": [{ "name": "Red" }] }),
        )
        .unwrap();
        let set = mapper.set_with_collection(&expanded).unwrap();
        assert_eq!(set.collection.slug, "dragons");
        let bare: raw::Set = parse(
            EntityKind::Set,
            &json!({ "id": "s1", "slug": "red", "collection": "col1", "translations": [{ "name": "Red" }] }),
        )
        .unwrap();
        assert!(matches!(&*mapper.set_with_collection(&bare).unwrap_err(), ErrorKind::DataIntegrity(_)));
    }

    #[test]
    fn test_homepage_skips_unexpanded() {
        let files = urls();
        let mapper = Mapper::new("en-UK", &files).at(NOW);
        let raw: raw::Homepage = parse(
            EntityKind::Homepage,
            &json!({
                "hero_pack": "p1",
                "featured_packs": [pack_json(false), "p2"],
                "featured_nfts": [collectible_json()],
                "featured_faqs": [{ "id": "f1", "key": "how", "translations": [{ "question": "How?", "answer": "So." }] }],
                "featured_rarities": [],
                "translations": [{ "languages_code": "en-UK", "featured_packs_title": "Hot" }],
            }),
        )
        .unwrap();
        let homepage = mapper.homepage(&raw).unwrap();
        assert_eq!(homepage.hero_pack_template, None);
        assert_eq!(homepage.featured_pack_templates.len(), 1);
        assert_eq!(homepage.featured_nft_templates.len(), 1);
        assert_eq!(homepage.featured_faqs[0].question.as_deref(), Some("How?"));
        assert_eq!(homepage.featured_packs_title.as_deref(), Some("Hot"));
    }

    #[test]
    fn test_countries_sorted_by_name() {
        let files = urls();
        let mapper = Mapper::new("en-UK", &files);
        let raw: raw::Application = parse(
            EntityKind::Application,
            &json!({
                "countries": [
                    { "countries_code": { "code": "US", "translations": [{ "languages_code": "en-UK", "title": "United States" }] } },
                    { "countries_code": { "code": "DE", "translations": [{ "languages_code": "en-UK", "title": "Germany" }] } },
                    { "countries_code": "FR" },
                ],
            }),
        )
        .unwrap();
        let countries = mapper.countries(&raw).unwrap();
        let names: Vec<_> = countries.iter().map(|country| country.name.as_str()).collect();
        assert_eq!(names, vec!["Germany", "United States"]);
    }

    #[test]
    fn test_page() {
        let files = urls();
        let mapper = Mapper::new("de-DE", &files);
        let raw: raw::Page = parse(
            EntityKind::Page,
            &json!({
                "id": "pg1",
                "slug": "about",
                "hero_banner": null,
                "translations": [{ "languages_code": "en-UK", "title": "About", "body": "Us" }],
            }),
        )
        .unwrap();
        let page = mapper.page(&raw).unwrap();
        assert_eq!(page.title, "About");
        assert_eq!(page.hero_banner, None);
    }
}
