//! Cache-read adapter: queries cached content and maps it into domain records.
//!
//! Every read takes an optional connection scope. Callers already inside a
//! transaction pass it in (`Some(&mut *tx)`) to observe a consistent snapshot;
//! otherwise a connection is acquired from the pool for the duration of the
//! read. Filters, sorts and pagination go through [`translate`], so reads
//! share the null-inclusive range policy and the virtual pack `status`.

use crate::Database;
use crate::error::{DatabaseResultExt, ErrorKind, Result};
use crate::models::ContentRow;
use crate::schema::Table;
use crate::translate::translate;
use exn::ResultExt;
use mirror_content::error::Result as MapResult;
use mirror_content::models::{
    CollectibleBase, CollectionWithSets, Country, FaqBase, HomepageBase, Language, PackBase, PageBase,
    SetWithCollection, TagBase,
};
use mirror_content::{EntityKind, FileUrls, Mapper, raw};
use mirror_query::{Condition, Filter, Limit, Pagination, Query, Sort, Value};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::pool::PoolConnection;
use sqlx::{FromRow, Row, Sqlite, SqliteConnection, SqlitePool};
use std::sync::Arc;
use time::OffsetDateTime;

/// Rows per page of the pack listing when the caller doesn't paginate.
const RELEASED_PAGE_SIZE: u64 = 10;

/// One page of mapped records.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Number of records matching the filter, ignoring pagination. Only
    /// computed when the query asked for it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

/// Reads cached content for callers, mapped for a requested locale.
#[derive(Clone)]
pub struct Reader {
    pool: SqlitePool,
    files: Arc<dyn FileUrls>,
    now: Option<OffsetDateTime>,
}

impl Reader {
    pub fn new(db: &Database, files: Arc<dyn FileUrls>) -> Self {
        Self { pool: db.pool().clone(), files, now: None }
    }

    /// Evaluate time-derived fields (pack status) at a fixed instant instead
    /// of the wall clock.
    pub fn at(mut self, now: OffsetDateTime) -> Self {
        self.now = Some(now);
        self
    }

    fn now(&self) -> OffsetDateTime {
        self.now.unwrap_or_else(OffsetDateTime::now_utc)
    }

    // =========================================================================
    // Packs
    // =========================================================================

    pub async fn find_packs(
        &self,
        query: &Query,
        locale: &str,
        conn: Option<&mut SqliteConnection>,
    ) -> Result<Page<PackBase>> {
        self.find_mapped(EntityKind::PackTemplate, query, locale, conn, |m, pack: &raw::PackTemplate| m.pack(pack))
            .await
    }

    /// The pack listing: packs without a release date or released before now.
    ///
    /// Without a sort the most recent release comes first, and without any
    /// pagination the first page of ten is returned. The total is always
    /// counted.
    pub async fn find_released_packs(
        &self,
        query: &Query,
        locale: &str,
        conn: Option<&mut SqliteConnection>,
    ) -> Result<Page<PackBase>> {
        // Range conditions include NULL, so unscheduled packs stay listed.
        let released = Filter::new("releasedAt", Condition::LessThan(Value::Timestamp(self.now())));
        let mut query = query.clone().filter(released).with_total_count();
        if query.sort.is_empty() {
            query.sort.push(Sort::desc("releasedAt"));
        }
        if query.pagination == Pagination::default() {
            query.pagination = Pagination::page(1, RELEASED_PAGE_SIZE);
        }
        self.find_packs(&query, locale, conn).await
    }

    pub async fn find_packs_by_template_ids(
        &self,
        ids: &[String],
        locale: &str,
        conn: Option<&mut SqliteConnection>,
    ) -> Result<Vec<PackBase>> {
        let query = Query::new().filter(Filter::in_set("id", ids.iter().map(String::as_str)));
        Ok(self.find_packs(&query, locale, conn).await?.items)
    }

    pub async fn find_pack_by_slug(
        &self,
        slug: &str,
        locale: &str,
        conn: Option<&mut SqliteConnection>,
    ) -> Result<Option<PackBase>> {
        Ok(self.find_packs(&single("slug", slug), locale, conn).await?.items.pop())
    }

    pub async fn find_pack_by_template_id(
        &self,
        id: &str,
        locale: &str,
        conn: Option<&mut SqliteConnection>,
    ) -> Result<Option<PackBase>> {
        Ok(self.find_packs(&single("id", id), locale, conn).await?.items.pop())
    }

    /// Auctions still running after `start`, most recently released first.
    ///
    /// Unlike the generic range filter this is strict: auctions without an
    /// end date are never included.
    pub async fn find_packs_auction_completion(
        &self,
        start: OffsetDateTime,
        locale: &str,
        conn: Option<&mut SqliteConnection>,
    ) -> Result<Vec<PackBase>> {
        let mut pooled = None;
        let conn = self.scope(conn, &mut pooled).await?;
        let rows: Vec<ContentRow> = sqlx::query_as(include_str!("../queries/find_packs_auction_completion.sql"))
            .bind(start.unix_timestamp())
            .fetch_all(&mut *conn)
            .await
            .or_database()?;
        let mapper = self.mapper(locale);
        map_rows(EntityKind::PackTemplate, &rows, |pack: &raw::PackTemplate| mapper.pack(pack))
    }

    // =========================================================================
    // Collectibles
    // =========================================================================

    pub async fn find_collectibles(
        &self,
        query: &Query,
        locale: &str,
        conn: Option<&mut SqliteConnection>,
    ) -> Result<Page<CollectibleBase>> {
        self.find_mapped(EntityKind::CollectibleTemplate, query, locale, conn, |m, template: &raw::CollectibleTemplate| {
            m.collectible(template)
        })
        .await
    }

    pub async fn find_collectibles_by_template_ids(
        &self,
        ids: &[String],
        locale: &str,
        conn: Option<&mut SqliteConnection>,
    ) -> Result<Vec<CollectibleBase>> {
        let query = Query::new().filter(Filter::in_set("id", ids.iter().map(String::as_str)));
        Ok(self.find_collectibles(&query, locale, conn).await?.items)
    }

    pub async fn find_collectible_by_template_id(
        &self,
        id: &str,
        locale: &str,
        conn: Option<&mut SqliteConnection>,
    ) -> Result<Option<CollectibleBase>> {
        Ok(self.find_collectibles(&single("id", id), locale, conn).await?.items.pop())
    }

    pub async fn find_collectible_by_unique_code(
        &self,
        unique_code: &str,
        locale: &str,
        conn: Option<&mut SqliteConnection>,
    ) -> Result<Option<CollectibleBase>> {
        Ok(self.find_collectibles(&single("uniqueCode", unique_code), locale, conn).await?.items.pop())
    }

    // =========================================================================
    // Collections & Sets
    // =========================================================================

    pub async fn find_collections(
        &self,
        query: &Query,
        locale: &str,
        conn: Option<&mut SqliteConnection>,
    ) -> Result<Page<CollectionWithSets>> {
        self.find_mapped(EntityKind::Collection, query, locale, conn, |m, collection: &raw::Collection| {
            m.collection_with_sets(collection)
        })
        .await
    }

    pub async fn find_collection_by_slug(
        &self,
        slug: &str,
        locale: &str,
        conn: Option<&mut SqliteConnection>,
    ) -> Result<Option<CollectionWithSets>> {
        Ok(self.find_collections(&single("slug", slug), locale, conn).await?.items.pop())
    }

    pub async fn find_set_by_slug(
        &self,
        slug: &str,
        locale: &str,
        conn: Option<&mut SqliteConnection>,
    ) -> Result<Option<SetWithCollection>> {
        let page = self
            .find_mapped(EntityKind::Set, &single("slug", slug), locale, conn, |m, set: &raw::Set| {
                m.set_with_collection(set)
            })
            .await?;
        Ok(page.items.into_iter().next())
    }

    // =========================================================================
    // Site Content
    // =========================================================================

    pub async fn find_homepage(&self, locale: &str, conn: Option<&mut SqliteConnection>) -> Result<Option<HomepageBase>> {
        let page = self
            .find_mapped(EntityKind::Homepage, &Query::new(), locale, conn, |m, homepage: &raw::Homepage| {
                m.homepage(homepage)
            })
            .await?;
        Ok(page.items.into_iter().next())
    }

    /// The application singleton, unmapped.
    pub async fn find_application(&self, conn: Option<&mut SqliteConnection>) -> Result<Option<serde_json::Value>> {
        let (rows, _) = self.fetch(EntityKind::Application, &Query::new(), conn).await?;
        rows.into_iter()
            .next()
            .map(|row| decode(EntityKind::Application, &row))
            .transpose()
    }

    /// Countries the application supports, sorted by localized name.
    pub async fn find_countries(&self, locale: &str, conn: Option<&mut SqliteConnection>) -> Result<Vec<Country>> {
        let page = self
            .find_mapped(EntityKind::Application, &Query::new(), locale, conn, |m, application: &raw::Application| {
                m.countries(application)
            })
            .await?;
        Ok(page.items.into_iter().next().unwrap_or_default())
    }

    pub async fn find_page_by_slug(
        &self,
        slug: &str,
        locale: &str,
        conn: Option<&mut SqliteConnection>,
    ) -> Result<Option<PageBase>> {
        let page = self
            .find_mapped(EntityKind::Page, &single("slug", slug), locale, conn, |m, page: &raw::Page| m.page(page))
            .await?;
        Ok(page.items.into_iter().next())
    }

    /// Every FAQ, in their configured order.
    pub async fn find_faqs(&self, locale: &str, conn: Option<&mut SqliteConnection>) -> Result<Vec<FaqBase>> {
        let query = Query::new().sort(Sort::asc("sort"));
        Ok(self.find_mapped(EntityKind::Faq, &query, locale, conn, |m, faq: &raw::Faq| m.faq(faq)).await?.items)
    }

    /// Every language, in their configured order.
    pub async fn find_languages(&self, conn: Option<&mut SqliteConnection>) -> Result<Vec<Language>> {
        let query = Query::new().sort(Sort::asc("sort"));
        let page = self
            .find_mapped(EntityKind::Language, &query, "", conn, |m, language: &raw::Language| Ok(m.language(language)))
            .await?;
        Ok(page.items)
    }

    pub async fn find_tags(&self, query: &Query, locale: &str, conn: Option<&mut SqliteConnection>) -> Result<Page<TagBase>> {
        self.find_mapped(EntityKind::Tag, query, locale, conn, |m, tag: &raw::Tag| m.tag(tag)).await
    }

    // =========================================================================
    // Generic
    // =========================================================================

    /// Query any cached kind, returning mapped records as JSON.
    ///
    /// Collections are mapped with their sets and sets with their collection,
    /// matching the slug lookups. The application singleton is returned raw.
    pub async fn find(
        &self,
        kind: EntityKind,
        query: &Query,
        locale: &str,
        conn: Option<&mut SqliteConnection>,
    ) -> Result<Page<serde_json::Value>> {
        match kind {
            EntityKind::PackTemplate => to_json(kind, self.find_packs(query, locale, conn).await?),
            EntityKind::CollectibleTemplate => to_json(kind, self.find_collectibles(query, locale, conn).await?),
            EntityKind::Collection => to_json(kind, self.find_collections(query, locale, conn).await?),
            EntityKind::Set => to_json(
                kind,
                self.find_mapped(kind, query, locale, conn, |m, set: &raw::Set| m.set_with_collection(set)).await?,
            ),
            EntityKind::Page => {
                to_json(kind, self.find_mapped(kind, query, locale, conn, |m, page: &raw::Page| m.page(page)).await?)
            },
            EntityKind::Faq => {
                to_json(kind, self.find_mapped(kind, query, locale, conn, |m, faq: &raw::Faq| m.faq(faq)).await?)
            },
            EntityKind::Application => {
                let (rows, total) = self.fetch(kind, query, conn).await?;
                let items = rows.iter().map(|row| decode(kind, row)).collect::<Result<Vec<_>>>()?;
                Ok(Page { items, total })
            },
            EntityKind::Homepage => to_json(
                kind,
                self.find_mapped(kind, query, locale, conn, |m, homepage: &raw::Homepage| m.homepage(homepage)).await?,
            ),
            EntityKind::Language => to_json(
                kind,
                self.find_mapped(kind, query, locale, conn, |m, language: &raw::Language| Ok(m.language(language)))
                    .await?,
            ),
            EntityKind::Tag => to_json(kind, self.find_tags(query, locale, conn).await?),
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn mapper<'a>(&'a self, locale: &'a str) -> Mapper<'a> {
        Mapper::new(locale, self.files.as_ref()).at(self.now())
    }

    /// Use the caller's connection if given, otherwise acquire one into `pooled`.
    async fn scope<'c>(
        &self,
        conn: Option<&'c mut SqliteConnection>,
        pooled: &'c mut Option<PoolConnection<Sqlite>>,
    ) -> Result<&'c mut SqliteConnection> {
        Ok(match conn {
            Some(conn) => conn,
            None => &mut **pooled.insert(self.pool.acquire().await.or_database()?),
        })
    }

    async fn fetch(
        &self,
        kind: EntityKind,
        query: &Query,
        conn: Option<&mut SqliteConnection>,
    ) -> Result<(Vec<ContentRow>, Option<u64>)> {
        let translated = translate(Table::of(kind), query, self.now())?;
        let mut pooled = None;
        let conn = self.scope(conn, &mut pooled).await?;
        let rows = translated
            .page
            .prepare()
            .fetch_all(&mut *conn)
            .await
            .or_database()?
            .iter()
            .map(ContentRow::from_row)
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .or_database()?;
        let total = match &translated.count {
            Some(count) => {
                let row = count.prepare().fetch_one(&mut *conn).await.or_database()?;
                let total: i64 = row.try_get(0).or_database()?;
                Some(total.unsigned_abs())
            },
            None => None,
        };
        Ok((rows, total))
    }

    async fn find_mapped<R, T>(
        &self,
        kind: EntityKind,
        query: &Query,
        locale: &str,
        conn: Option<&mut SqliteConnection>,
        map: impl Fn(&Mapper<'_>, &R) -> MapResult<T>,
    ) -> Result<Page<T>>
    where
        R: DeserializeOwned,
    {
        let (rows, total) = self.fetch(kind, query, conn).await?;
        let mapper = self.mapper(locale);
        let items = map_rows(kind, &rows, |record: &R| map(&mapper, record))?;
        Ok(Page { items, total })
    }
}

/// An equality lookup expected to match at most one row.
fn single(field: &str, value: &str) -> Query {
    Query::new().filter(Filter::eq(field, value)).limit(Limit::Rows(1))
}

fn decode<R: DeserializeOwned>(kind: EntityKind, row: &ContentRow) -> Result<R> {
    serde_json::from_str(&row.content).or_raise(|| ErrorKind::InvalidData(format!("content of cached {kind} {}", row.id)))
}

/// Decode and map rows, failing on the first record that can't be mapped.
fn map_rows<R, T>(kind: EntityKind, rows: &[ContentRow], map: impl Fn(&R) -> MapResult<T>) -> Result<Vec<T>>
where
    R: DeserializeOwned,
{
    rows.iter()
        .map(|row| {
            let record: R = decode(kind, row)?;
            map(&record).or_raise(|| ErrorKind::DataIntegrity(format!("{kind} {}", row.id)))
        })
        .collect()
}

fn to_json<T: Serialize>(kind: EntityKind, page: Page<T>) -> Result<Page<serde_json::Value>> {
    let Page { items, total } = page;
    let items = items
        .iter()
        .map(|item| serde_json::to_value(item).or_raise(|| ErrorKind::InvalidData(format!("mapped {kind}"))))
        .collect::<Result<Vec<_>>>()?;
    Ok(Page { items, total })
}
