use super::SINGLETON_ID;
use crate::error::{Error, ErrorKind, Result};
use exn::ResultExt;
use mirror_content::EntityKind;
use mirror_content::raw::{self, Application, CollectibleTemplate, Collection, Faq, Homepage, Language, Page, PackTemplate, Set, Tag};
use time::OffsetDateTime;

/// Scalar columns derived from a raw record, one variant per table layout.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Scalars {
    PackTemplate {
        slug: String,
        pack_type: &'static str,
        price: Option<i64>,
        released_at: Option<i64>,
        auction_until: Option<i64>,
        tags: String,
    },
    CollectibleTemplate {
        collection_id: Option<String>,
        set_id: Option<String>,
        unique_code: Option<String>,
        total_editions: Option<i64>,
        tags: String,
    },
    Collection {
        slug: String,
        sort: Option<i64>,
    },
    Set {
        slug: String,
        collection_id: Option<String>,
        sort: Option<i64>,
    },
    Page {
        slug: String,
    },
    Faq {
        key: Option<String>,
        sort: Option<i64>,
    },
    Singleton,
    Language {
        sort: Option<i64>,
        label: Option<String>,
    },
    Tag {
        slug: String,
    },
}

/// Everything needed to upsert one raw record.
///
/// The scalar columns are always derived from the same value that is stored
/// as `content`, so the two can never disagree.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EntityRow {
    pub(crate) kind: EntityKind,
    pub(crate) id: String,
    pub(crate) content: String,
    pub(crate) scalars: Scalars,
}

impl EntityRow {
    pub(crate) fn derive(kind: EntityKind, record: &serde_json::Value) -> Result<Self> {
        let invalid = || ErrorKind::InvalidData(format!("{kind} record"));
        let (id, scalars) = match kind {
            EntityKind::PackTemplate => {
                let pack: PackTemplate = raw::parse(kind, record).or_raise(invalid)?;
                let scalars = Scalars::PackTemplate {
                    slug: required_slug(kind, &pack.id.to_string(), &pack.slug)?,
                    pack_type: pack.pack_type.as_str(),
                    price: pack.price,
                    released_at: pack.released_at.map(OffsetDateTime::unix_timestamp),
                    auction_until: pack.auction_until.map(OffsetDateTime::unix_timestamp),
                    tags: tag_list(&pack.tag_slugs())?,
                };
                (pack.id.to_string(), scalars)
            },
            EntityKind::CollectibleTemplate => {
                let template: CollectibleTemplate = raw::parse(kind, record).or_raise(invalid)?;
                let scalars = Scalars::CollectibleTemplate {
                    collection_id: template.collection_id(),
                    set_id: template.set_id(),
                    unique_code: template.unique_code.clone(),
                    total_editions: template.total_editions.map(i64::from),
                    tags: tag_list(&template.tag_slugs())?,
                };
                (template.id.to_string(), scalars)
            },
            EntityKind::Collection => {
                let collection: Collection = raw::parse(kind, record).or_raise(invalid)?;
                let id = collection.id.to_string();
                let slug = required_slug(kind, &id, &collection.slug)?;
                (id, Scalars::Collection { slug, sort: collection.sort })
            },
            EntityKind::Set => {
                let set: Set = raw::parse(kind, record).or_raise(invalid)?;
                let id = set.id.to_string();
                let slug = required_slug(kind, &id, &set.slug)?;
                (id, Scalars::Set { slug, collection_id: set.collection_id(), sort: set.sort })
            },
            EntityKind::Page => {
                let page: Page = raw::parse(kind, record).or_raise(invalid)?;
                let id = page.id.to_string();
                let slug = required_slug(kind, &id, &page.slug)?;
                (id, Scalars::Page { slug })
            },
            EntityKind::Faq => {
                let faq: Faq = raw::parse(kind, record).or_raise(invalid)?;
                (faq.id.to_string(), Scalars::Faq { key: faq.key, sort: faq.sort })
            },
            // Singletons are validated against their shape but stored under a fixed key.
            EntityKind::Application => {
                let _: Application = raw::parse(kind, record).or_raise(invalid)?;
                (SINGLETON_ID.to_string(), Scalars::Singleton)
            },
            EntityKind::Homepage => {
                let _: Homepage = raw::parse(kind, record).or_raise(invalid)?;
                (SINGLETON_ID.to_string(), Scalars::Singleton)
            },
            EntityKind::Language => {
                let language: Language = raw::parse(kind, record).or_raise(invalid)?;
                (language.code.to_string(), Scalars::Language { sort: language.sort, label: language.label })
            },
            EntityKind::Tag => {
                let tag: Tag = raw::parse(kind, record).or_raise(invalid)?;
                let id = tag.id.to_string();
                let slug = required_slug(kind, &id, &tag.slug)?;
                (id, Scalars::Tag { slug })
            },
        };
        if id.trim().is_empty() {
            exn::bail!(ErrorKind::InvalidData(format!("{kind} record without an identifier")));
        }
        let content = serde_json::to_string(record).or_raise(invalid)?;
        Ok(Self { kind, id, content, scalars })
    }
}

fn required_slug(kind: EntityKind, id: &str, slug: &str) -> Result<String> {
    match slug.trim() {
        "" => Err(Error::from(ErrorKind::InvalidData(format!("{kind} {id} has no slug")))),
        slug => Ok(slug.to_string()),
    }
}

fn tag_list(slugs: &[String]) -> Result<String> {
    serde_json::to_string(slugs).or_raise(|| ErrorKind::InvalidData("tags".to_string()))
}
