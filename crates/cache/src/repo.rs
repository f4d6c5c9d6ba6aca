//! Write-side repository for cached entities.
//!
//! Every entity kind has its own table, but they all share the same shape: a
//! remote identifier, the raw record as `content`, a handful of scalar columns
//! derived from it, and bookkeeping timestamps. The sync engine is the only
//! writer; reads that map content into domain records live in
//! [`Reader`](crate::Reader).

use crate::Database;
use crate::error::{DatabaseResultExt, Result};
use crate::models::{CachedRow, ContentRow, EntityRow, Scalars};
use crate::schema::Table;
use mirror_content::EntityKind;
use sqlx::SqlitePool;
use std::collections::HashSet;
use time::OffsetDateTime;

/// A point in the cache's write history, captured before a remote fetch.
///
/// Rows synced at or after the mark may be newer than the fetched snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SyncMark(i64);

impl SyncMark {
    pub fn now() -> Self {
        let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
        Self(i64::try_from(nanos).unwrap_or(i64::MAX))
    }
}

/// What pruning does to a stale row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prune {
    /// Set `deleted_at`; only visible rows count.
    Hide,
    /// Delete the row, hidden or not.
    Purge,
}

/// Repository for upserting, hiding and purging cached entities.
///
/// A dry-run repository derives and validates rows exactly as a real one
/// would, but never writes.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
    dry_run: bool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone(), dry_run: false }
    }
}
impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool, dry_run: bool) -> Self {
        Self { pool, dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    // =========================================================================
    // Write
    // =========================================================================

    /// Insert or replace the cached copy of a raw remote record.
    ///
    /// The scalar columns are re-derived from `record` and the whole row is
    /// written with a single `INSERT .. ON CONFLICT (id) DO UPDATE`, so two
    /// concurrent syncs of the same identifier can never produce two rows; the
    /// last write wins. The original `created_at` survives an update, and a
    /// previously hidden row becomes visible again.
    ///
    /// Returns the identifier the record was stored under.
    pub async fn upsert(&self, kind: EntityKind, record: &serde_json::Value) -> Result<String> {
        let row = EntityRow::derive(kind, record)?;
        if self.dry_run {
            return Ok(row.id);
        }
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let query = match &row.scalars {
            Scalars::PackTemplate { slug, pack_type, price, released_at, auction_until, tags } => {
                sqlx::query(include_str!("../queries/upsert_pack_template.sql"))
                    .bind(&row.id)
                    .bind(slug)
                    .bind(*pack_type)
                    .bind(*price)
                    .bind(*released_at)
                    .bind(*auction_until)
                    .bind(tags)
            },
            Scalars::CollectibleTemplate { collection_id, set_id, unique_code, total_editions, tags } => {
                sqlx::query(include_str!("../queries/upsert_collectible_template.sql"))
                    .bind(&row.id)
                    .bind(collection_id)
                    .bind(set_id)
                    .bind(unique_code)
                    .bind(*total_editions)
                    .bind(tags)
            },
            Scalars::Collection { slug, sort } => sqlx::query(include_str!("../queries/upsert_collection.sql"))
                .bind(&row.id)
                .bind(slug)
                .bind(*sort),
            Scalars::Set { slug, collection_id, sort } => sqlx::query(include_str!("../queries/upsert_set.sql"))
                .bind(&row.id)
                .bind(slug)
                .bind(collection_id)
                .bind(*sort),
            Scalars::Page { slug } => sqlx::query(include_str!("../queries/upsert_page.sql")).bind(&row.id).bind(slug),
            Scalars::Faq { key, sort } => {
                sqlx::query(include_str!("../queries/upsert_faq.sql")).bind(&row.id).bind(key).bind(*sort)
            },
            Scalars::Singleton => match kind {
                EntityKind::Application => sqlx::query(include_str!("../queries/upsert_application.sql")).bind(&row.id),
                _ => sqlx::query(include_str!("../queries/upsert_homepage.sql")).bind(&row.id),
            },
            Scalars::Language { sort, label } => {
                sqlx::query(include_str!("../queries/upsert_language.sql")).bind(&row.id).bind(*sort).bind(label)
            },
            Scalars::Tag { slug } => sqlx::query(include_str!("../queries/upsert_tag.sql")).bind(&row.id).bind(slug),
        };
        query
            .bind(&row.content)
            .bind(now)
            .bind(now)
            .bind(SyncMark::now().0)
            .execute(&self.pool)
            .await
            .or_database()?;
        tracing::debug!(collection = %kind, id = %row.id, "Upserted cached record");
        Ok(row.id)
    }

    /// Mark a cached row as deleted, hiding it from every read.
    ///
    /// Returns `true` if a visible row was hidden.
    pub async fn hide(&self, kind: EntityKind, id: &str) -> Result<bool> {
        let table = Table::of(kind).name;
        if self.dry_run {
            return self.is_visible(kind, id).await;
        }
        let statement = format!("UPDATE {table} SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL");
        let result = sqlx::query(&statement)
            .bind(OffsetDateTime::now_utc().unix_timestamp())
            .bind(id)
            .execute(&self.pool)
            .await
            .or_database()?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a cached row outright.
    ///
    /// Returns `true` if a row (visible or hidden) was removed.
    pub async fn purge(&self, kind: EntityKind, id: &str) -> Result<bool> {
        let table = Table::of(kind).name;
        if self.dry_run {
            let statement = format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE id = ?)");
            let exists: bool = sqlx::query_scalar(&statement)
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .or_database()?;
            return Ok(exists);
        }
        let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = ?"))
            .bind(id)
            .execute(&self.pool)
            .await
            .or_database()?;
        Ok(result.rows_affected() > 0)
    }

    /// Hide or purge every row of `kind` that was last synced before `since`
    /// and isn't in `keep`.
    ///
    /// Each row is re-checked against `since` as it is changed, so a row a
    /// concurrent sync writes after the mark survives. Returns how many rows
    /// were changed.
    pub async fn prune(
        &self,
        kind: EntityKind,
        keep: &HashSet<String>,
        since: SyncMark,
        mode: Prune,
    ) -> Result<usize> {
        let table = Table::of(kind).name;
        let (candidates, statement) = match mode {
            Prune::Hide => (
                format!("SELECT id FROM {table} WHERE synced_at < ? AND deleted_at IS NULL ORDER BY id"),
                format!("UPDATE {table} SET deleted_at = ? WHERE id = ? AND synced_at < ? AND deleted_at IS NULL"),
            ),
            Prune::Purge => (
                format!("SELECT id FROM {table} WHERE synced_at < ? ORDER BY id"),
                format!("DELETE FROM {table} WHERE id = ? AND synced_at < ?"),
            ),
        };
        let stale: Vec<String> = sqlx::query_scalar(&candidates)
            .bind(since.0)
            .fetch_all(&self.pool)
            .await
            .or_database()?;
        let mut pruned = 0;
        for id in stale.iter().filter(|id| !keep.contains(*id)) {
            if self.dry_run {
                pruned += 1;
                continue;
            }
            let mut query = sqlx::query(&statement);
            if mode == Prune::Hide {
                query = query.bind(OffsetDateTime::now_utc().unix_timestamp());
            }
            let result = query
                .bind(id)
                .bind(since.0)
                .execute(&self.pool)
                .await
                .or_database()?;
            if result.rows_affected() > 0 {
                tracing::debug!(collection = %kind, %id, ?mode, "Pruned cached record");
                pruned += 1;
            }
        }
        Ok(pruned)
    }

    // =========================================================================
    // Get/Fetch
    // =========================================================================

    /// Get a visible cached row by identifier.
    pub async fn get(&self, kind: EntityKind, id: &str) -> Result<Option<CachedRow>> {
        let table = Table::of(kind).name;
        let row: Option<ContentRow> = sqlx::query_as(&format!(
            "SELECT id, content, created_at, updated_at FROM {table} WHERE id = ? AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .or_database()?;
        row.map(CachedRow::try_from).transpose()
    }

    async fn is_visible(&self, kind: EntityKind, id: &str) -> Result<bool> {
        let table = Table::of(kind).name;
        let statement = format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE id = ? AND deleted_at IS NULL)");
        sqlx::query_scalar(&statement)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .or_database()
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// List every cached identifier of a kind, including hidden rows.
    ///
    /// Used to find rows that disappeared from the remote source after a full
    /// resync.
    pub async fn ids(&self, kind: EntityKind) -> Result<Vec<String>> {
        let table = Table::of(kind).name;
        sqlx::query_scalar(&format!("SELECT id FROM {table} ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .or_database()
    }

    /// Count the visible rows of a kind.
    pub async fn count(&self, kind: EntityKind) -> Result<u64> {
        let table = Table::of(kind).name;
        let statement = format!("SELECT COUNT(*) FROM {table} WHERE deleted_at IS NULL");
        let count: i64 = sqlx::query_scalar(&statement)
            .fetch_one(&self.pool)
            .await
            .or_database()?;
        Ok(count.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::SINGLETON_ID;
    use serde_json::json;

    async fn repository() -> Repository {
        let db = Database::connect_in_memory().await.unwrap();
        Repository::from(&db)
    }

    fn pack(id: &str, slug: &str) -> serde_json::Value {
        json!({ "id": id, "slug": slug, "type": "purchase", "price": 500, "status": "published" })
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let repo = repository().await;
        let record = pack("pack-1", "starter");
        assert_eq!(repo.upsert(EntityKind::PackTemplate, &record).await.unwrap(), "pack-1");
        let first = repo.get(EntityKind::PackTemplate, "pack-1").await.unwrap().unwrap();
        repo.upsert(EntityKind::PackTemplate, &record).await.unwrap();
        let second = repo.get(EntityKind::PackTemplate, "pack-1").await.unwrap().unwrap();
        assert_eq!(repo.count(EntityKind::PackTemplate).await.unwrap(), 1);
        assert_eq!(first.content, second.content);
        assert_eq!(first.created_at, second.created_at);
        let price: Option<i64> = sqlx::query_scalar("SELECT price FROM pack_templates WHERE id = 'pack-1'")
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        assert_eq!(price, Some(500));
    }

    #[tokio::test]
    async fn test_upsert_replaces_content_and_scalars() {
        let repo = repository().await;
        repo.upsert(EntityKind::PackTemplate, &pack("pack-1", "starter")).await.unwrap();
        repo.upsert(EntityKind::PackTemplate, &pack("pack-1", "renamed")).await.unwrap();
        let row = repo.get(EntityKind::PackTemplate, "pack-1").await.unwrap().unwrap();
        assert_eq!(row.content["slug"], "renamed");
        let slug: String = sqlx::query_scalar("SELECT slug FROM pack_templates WHERE id = 'pack-1'")
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        assert_eq!(slug, "renamed");
    }

    #[tokio::test]
    async fn test_hide_then_upsert_restores() {
        let repo = repository().await;
        repo.upsert(EntityKind::Page, &json!({ "id": 1, "slug": "about" })).await.unwrap();
        assert!(repo.hide(EntityKind::Page, "1").await.unwrap());
        assert!(!repo.hide(EntityKind::Page, "1").await.unwrap());
        assert!(repo.get(EntityKind::Page, "1").await.unwrap().is_none());
        assert_eq!(repo.count(EntityKind::Page).await.unwrap(), 0);
        assert_eq!(repo.ids(EntityKind::Page).await.unwrap(), vec!["1".to_string()]);
        repo.upsert(EntityKind::Page, &json!({ "id": 1, "slug": "about" })).await.unwrap();
        assert!(repo.get(EntityKind::Page, "1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge() {
        let repo = repository().await;
        repo.upsert(EntityKind::Tag, &json!({ "id": "t1", "slug": "gold" })).await.unwrap();
        assert!(repo.purge(EntityKind::Tag, "t1").await.unwrap());
        assert!(!repo.purge(EntityKind::Tag, "t1").await.unwrap());
        assert!(repo.ids(EntityKind::Tag).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prune_skips_rows_synced_after_the_mark() {
        let repo = repository().await;
        repo.upsert(EntityKind::PackTemplate, &pack("kept", "kept")).await.unwrap();
        repo.upsert(EntityKind::PackTemplate, &pack("stale", "stale")).await.unwrap();
        let since = SyncMark::now();
        // Written while the snapshot was being fetched.
        repo.upsert(EntityKind::PackTemplate, &pack("fresh", "fresh")).await.unwrap();

        let keep = HashSet::from(["kept".to_string()]);
        assert_eq!(repo.prune(EntityKind::PackTemplate, &keep, since, Prune::Hide).await.unwrap(), 1);
        assert!(repo.get(EntityKind::PackTemplate, "stale").await.unwrap().is_none());
        assert!(repo.get(EntityKind::PackTemplate, "fresh").await.unwrap().is_some());
        assert_eq!(repo.count(EntityKind::PackTemplate).await.unwrap(), 2);
        // Hidden rows don't count twice.
        assert_eq!(repo.prune(EntityKind::PackTemplate, &keep, since, Prune::Hide).await.unwrap(), 0);
        // But purging removes them.
        assert_eq!(repo.prune(EntityKind::PackTemplate, &keep, since, Prune::Purge).await.unwrap(), 1);
        assert_eq!(repo.ids(EntityKind::PackTemplate).await.unwrap(), vec!["fresh", "kept"]);
    }

    #[tokio::test]
    async fn test_singletons() {
        let repo = repository().await;
        repo.upsert(EntityKind::Homepage, &json!({ "id": 1 })).await.unwrap();
        repo.upsert(EntityKind::Homepage, &json!({ "id": 2 })).await.unwrap();
        assert_eq!(repo.ids(EntityKind::Homepage).await.unwrap(), vec![SINGLETON_ID.to_string()]);
        let row = repo.get(EntityKind::Homepage, SINGLETON_ID).await.unwrap().unwrap();
        assert_eq!(row.content["id"], 2);
        assert_eq!(repo.count(EntityKind::Application).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let db = Database::connect_in_memory().await.unwrap();
        let live = Repository::from(&db);
        let dry = Repository::new(db.pool().clone(), true);
        assert_eq!(dry.upsert(EntityKind::PackTemplate, &pack("p", "s")).await.unwrap(), "p");
        assert_eq!(live.count(EntityKind::PackTemplate).await.unwrap(), 0);
        live.upsert(EntityKind::PackTemplate, &pack("p", "s")).await.unwrap();
        assert!(dry.hide(EntityKind::PackTemplate, "p").await.unwrap());
        assert!(dry.purge(EntityKind::PackTemplate, "p").await.unwrap());
        assert_eq!(live.count(EntityKind::PackTemplate).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_record_is_rejected() {
        let repo = repository().await;
        let err = repo.upsert(EntityKind::PackTemplate, &json!({ "slug": "x", "type": "free" })).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData(_)));
        assert_eq!(repo.count(EntityKind::PackTemplate).await.unwrap(), 0);
    }
}
