//! Pulling remote content into the cache.
//!
//! Two paths keep the cache current:
//!
//! - **Incremental** ([`SyncEngine::sync_item`]): re-fetch a single record by
//!   key, typically because a webhook said it changed.
//! - **Full resync** ([`SyncEngine::sync_all`]): re-fetch every published
//!   record of a kind, then prune cached rows the remote no longer returns.
//!
//! Records are upserted one at a time and each upsert commits on its own, so
//! a failure part-way through leaves earlier records in place.

use crate::SyncPolicy;
use crate::error::{CacheResultExt, ErrorKind, RemoteResultExt, Result};
use crate::policy::{OnDelete, OnUnpublish};
use exn::ResultExt;
use mirror_cache::{Prune, Repository, SINGLETON_ID, SyncMark};
use mirror_content::{EntityKind, HasKey, RelationList, raw};
use mirror_query::Filter;
use mirror_remote::{Collection, ItemQuery, RemoteHandle, defaults};
use serde_json::Value as Json;
use std::collections::HashSet;
use std::fmt::{Display, Formatter, Result as FmtResult};
use tracing::instrument;

/// What syncing (or deleting) one record did to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// The record was fetched and written.
    Upserted,
    /// The record is gone remotely (or deleted) but policy keeps the cached row.
    Retained,
    Hidden,
    Purged,
    /// Policy asked to hide or purge, but there was no visible row to change.
    Unchanged,
}

impl Display for Change {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::Upserted => "upserted",
            Self::Retained => "retained",
            Self::Hidden => "hidden",
            Self::Purged => "purged",
            Self::Unchanged => "unchanged",
        })
    }
}

/// Totals from a full resync of one kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Resync {
    /// Records the remote returned.
    pub fetched: usize,
    pub upserted: usize,
    /// Cached rows hidden or purged because the remote no longer returned them.
    pub pruned: usize,
}

impl Display for Resync {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "fetched {}, upserted {}, pruned {}", self.fetched, self.upserted, self.pruned)
    }
}

/// Keeps the cache in step with the remote content service.
///
/// The engine is the only writer to the cache. It holds no state between
/// calls beyond its handles, so one engine can serve webhook deliveries and
/// scheduled resyncs side by side.
#[derive(Clone)]
pub struct SyncEngine {
    remote: RemoteHandle,
    cache: Repository,
    policy: SyncPolicy,
}

impl SyncEngine {
    pub fn new(remote: RemoteHandle, cache: Repository, policy: SyncPolicy) -> Self {
        Self { remote, cache, policy }
    }

    pub fn policy(&self) -> &SyncPolicy {
        &self.policy
    }

    pub fn cache(&self) -> &Repository {
        &self.cache
    }

    // ====================================================================
    // Incremental
    // ====================================================================

    /// Re-fetch one record by key and upsert it.
    ///
    /// When the remote doesn't return the record (deleted, unpublished or
    /// never existed) the `on_unpublish` policy decides what happens to the
    /// cached row. With `follow_related`, syncing a collection also syncs its
    /// sets and collectible templates, and syncing a set also syncs its
    /// collection and collectible templates; related records don't recurse.
    ///
    /// Singleton kinds ignore the key.
    #[instrument(skip(self), fields(remote = self.remote.name()))]
    pub async fn sync_item(&self, kind: EntityKind, key: &str) -> Result<Change> {
        if kind.is_singleton() {
            return self.sync_singleton(kind).await;
        }
        let (change, record) = self.sync_key(kind, key).await?;
        if let Some(record) = record
            && self.policy.follow_related
        {
            let related = self.sync_related(kind, &record).await?;
            if related > 0 {
                tracing::debug!(%kind, key, related, "Synced related records");
            }
        }
        Ok(change)
    }

    /// Fetch and upsert one keyed record, returning it when it was found.
    async fn sync_key(&self, kind: EntityKind, key: &str) -> Result<(Change, Option<Json>)> {
        let mut query = defaults(Collection::from(kind)).filter(Filter::eq(kind.key_field(), key));
        if kind.has_status() {
            query = query.published();
        }
        let response = self.remote.fetch(Collection::from(kind), &query).await.or_remote()?;
        match response.data.into_iter().next() {
            Some(record) => {
                let id = self.cache.upsert(kind, &record).await.or_cache()?;
                tracing::info!(%kind, id, "Synced record");
                Ok((Change::Upserted, Some(record)))
            },
            None => {
                let change = self.unpublish(kind, key).await?;
                tracing::info!(%kind, key, %change, "Record not published remotely");
                Ok((change, None))
            },
        }
    }

    async fn sync_related(&self, kind: EntityKind, record: &Json) -> Result<usize> {
        let invalid = || ErrorKind::Content(kind.to_string());
        let related: Vec<(EntityKind, String)> = match kind {
            EntityKind::Collection => {
                let collection: raw::Collection = raw::parse(kind, record).or_raise(invalid)?;
                let sets = ids(collection.sets.as_ref()).into_iter().map(|id| (EntityKind::Set, id));
                let templates =
                    ids(collection.nft_templates.as_ref()).into_iter().map(|id| (EntityKind::CollectibleTemplate, id));
                sets.chain(templates).collect()
            },
            EntityKind::Set => {
                let set: raw::Set = raw::parse(kind, record).or_raise(invalid)?;
                let templates =
                    ids(set.nft_templates.as_ref()).into_iter().map(|id| (EntityKind::CollectibleTemplate, id));
                templates.chain(set.collection_id().map(|id| (EntityKind::Collection, id))).collect()
            },
            _ => return Ok(0),
        };
        for (kind, key) in &related {
            self.sync_key(*kind, key).await?;
        }
        Ok(related.len())
    }

    /// Re-fetch a singleton (`application` or `homepage`).
    #[instrument(skip(self), fields(remote = self.remote.name()))]
    pub async fn sync_singleton(&self, kind: EntityKind) -> Result<Change> {
        if !kind.is_singleton() {
            exn::bail!(ErrorKind::UnhandledEntityType(format!("{kind} is not a singleton")));
        }
        let response = self.remote.fetch(Collection::from(kind), &defaults(Collection::from(kind))).await.or_remote()?;
        match response.first() {
            Some(record) => {
                self.cache.upsert(kind, record).await.or_cache()?;
                tracing::info!(%kind, "Synced singleton");
                Ok(Change::Upserted)
            },
            None => self.unpublish(kind, SINGLETON_ID).await,
        }
    }

    // ====================================================================
    // Full resync
    // ====================================================================

    /// Re-fetch every published record of a kind.
    ///
    /// Cached rows the remote didn't return are then pruned according to
    /// `on_unpublish`. Pruning only happens after every fetched record has
    /// been upserted, so a failed run never prunes, and it skips rows written
    /// after the fetch started, which a concurrent webhook may have synced.
    #[instrument(skip(self), fields(remote = self.remote.name()))]
    pub async fn sync_all(&self, kind: EntityKind) -> Result<Resync> {
        if kind.is_singleton() {
            let change = self.sync_singleton(kind).await?;
            let upserted = usize::from(change == Change::Upserted);
            return Ok(Resync { fetched: upserted, upserted, pruned: 0 });
        }
        let mut query: ItemQuery = defaults(Collection::from(kind));
        if kind.has_status() {
            query = query.published();
        }
        // Anything written after this point may be newer than the snapshot.
        let since = SyncMark::now();
        let response = self.remote.fetch(Collection::from(kind), &query).await.or_remote()?;

        let mut resync = Resync { fetched: response.data.len(), ..Resync::default() };
        let mut seen = HashSet::with_capacity(response.data.len());
        for record in &response.data {
            let id = self.cache.upsert(kind, record).await.or_cache()?;
            seen.insert(id);
            resync.upserted += 1;
        }

        let prune = match self.policy.on_unpublish {
            OnUnpublish::Retain => None,
            OnUnpublish::Hide => Some(Prune::Hide),
            OnUnpublish::Purge => Some(Prune::Purge),
        };
        if let Some(mode) = prune {
            resync.pruned = self.cache.prune(kind, &seen, since, mode).await.or_cache()?;
        }
        tracing::info!(
            %kind,
            fetched = resync.fetched,
            upserted = resync.upserted,
            pruned = resync.pruned,
            "Resynced"
        );
        Ok(resync)
    }

    /// Resync every kind, in dependency order. Stops at the first failure.
    #[instrument(skip(self), fields(remote = self.remote.name()))]
    pub async fn sync_everything(&self) -> Result<Vec<(EntityKind, Resync)>> {
        let mut results = Vec::with_capacity(EntityKind::ALL.len());
        for kind in EntityKind::ALL {
            results.push((kind, self.sync_all(kind).await?));
        }
        Ok(results)
    }

    // ====================================================================
    // Removal
    // ====================================================================

    /// Apply the `on_delete` policy to a record the remote reports deleted.
    #[instrument(skip(self))]
    pub async fn delete(&self, kind: EntityKind, key: &str) -> Result<Change> {
        let id = if kind.is_singleton() { SINGLETON_ID } else { key };
        let change = match self.policy.on_delete {
            OnDelete::Unhandled => exn::bail!(ErrorKind::UnhandledOperation(format!("items.delete on {kind}"))),
            OnDelete::Retain => Change::Retained,
            OnDelete::Hide => self.hide(kind, id).await?,
            OnDelete::Purge => self.purge(kind, id).await?,
        };
        tracing::info!(%kind, key, %change, "Applied delete");
        Ok(change)
    }

    async fn unpublish(&self, kind: EntityKind, id: &str) -> Result<Change> {
        match self.policy.on_unpublish {
            OnUnpublish::Retain => Ok(Change::Retained),
            OnUnpublish::Hide => self.hide(kind, id).await,
            OnUnpublish::Purge => self.purge(kind, id).await,
        }
    }

    async fn hide(&self, kind: EntityKind, id: &str) -> Result<Change> {
        let hidden = self.cache.hide(kind, id).await.or_cache()?;
        Ok(if hidden { Change::Hidden } else { Change::Unchanged })
    }

    async fn purge(&self, kind: EntityKind, id: &str) -> Result<Change> {
        let purged = self.cache.purge(kind, id).await.or_cache()?;
        Ok(if purged { Change::Purged } else { Change::Unchanged })
    }
}

fn ids<T: HasKey>(list: Option<&RelationList<T>>) -> Vec<String> {
    list.map(RelationList::ids).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use mirror_cache::Database;
    use async_trait::async_trait;
    use mirror_remote::{ItemsResponse, MockRemote, RemoteSource};
    use serde_json::json;
    use std::sync::Arc;

    async fn setup(remote: MockRemote, policy: SyncPolicy) -> (Database, Arc<MockRemote>, SyncEngine) {
        let db = Database::connect_in_memory().await.unwrap();
        let remote = Arc::new(remote);
        let handle: RemoteHandle = remote.clone();
        let engine = SyncEngine::new(handle, Repository::from(&db), policy);
        (db, remote, engine)
    }

    fn pack(id: &str, status: &str) -> Json {
        json!({ "id": id, "status": status, "slug": id, "type": "purchase" })
    }

    fn policy(on_unpublish: OnUnpublish) -> SyncPolicy {
        SyncPolicy { on_unpublish, ..SyncPolicy::default() }
    }

    #[tokio::test]
    async fn test_sync_item_upserts_published_record() {
        let remote = MockRemote::with_records([(Collection::PackTemplates, pack("p1", "published"))]);
        let (_db, _remote, engine) = setup(remote, SyncPolicy::default()).await;
        assert_eq!(engine.sync_item(EntityKind::PackTemplate, "p1").await.unwrap(), Change::Upserted);
        let row = engine.cache().get(EntityKind::PackTemplate, "p1").await.unwrap().unwrap();
        assert_eq!(row.content["slug"], "p1");
    }

    #[tokio::test]
    async fn test_sync_item_skips_drafts() {
        let remote = MockRemote::with_records([(Collection::PackTemplates, pack("p1", "draft"))]);
        let (_db, _remote, engine) = setup(remote, SyncPolicy::default()).await;
        assert_eq!(engine.sync_item(EntityKind::PackTemplate, "p1").await.unwrap(), Change::Retained);
        assert_eq!(engine.cache().count(EntityKind::PackTemplate).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unpublished_record_is_retained_by_default() {
        let remote = MockRemote::with_records([(Collection::PackTemplates, pack("p1", "published"))]);
        let (_db, remote, engine) = setup(remote, SyncPolicy::default()).await;
        engine.sync_item(EntityKind::PackTemplate, "p1").await.unwrap();
        remote.put(Collection::PackTemplates, pack("p1", "archived")).await;
        assert_eq!(engine.sync_item(EntityKind::PackTemplate, "p1").await.unwrap(), Change::Retained);
        assert!(engine.cache().get(EntityKind::PackTemplate, "p1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unpublished_record_is_hidden() {
        let remote = MockRemote::with_records([(Collection::PackTemplates, pack("p1", "published"))]);
        let (_db, remote, engine) = setup(remote, policy(OnUnpublish::Hide)).await;
        engine.sync_item(EntityKind::PackTemplate, "p1").await.unwrap();
        remote.put(Collection::PackTemplates, pack("p1", "draft")).await;
        assert_eq!(engine.sync_item(EntityKind::PackTemplate, "p1").await.unwrap(), Change::Hidden);
        assert!(engine.cache().get(EntityKind::PackTemplate, "p1").await.unwrap().is_none());
        // Already hidden.
        assert_eq!(engine.sync_item(EntityKind::PackTemplate, "p1").await.unwrap(), Change::Unchanged);
        // Republishing restores it.
        remote.put(Collection::PackTemplates, pack("p1", "published")).await;
        engine.sync_item(EntityKind::PackTemplate, "p1").await.unwrap();
        assert!(engine.cache().get(EntityKind::PackTemplate, "p1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_collection_follows_sets_and_templates() {
        let remote = MockRemote::with_records([
            (
                Collection::Collections,
                json!({ "id": "col", "status": "published", "slug": "heroes", "sets": ["s1"], "nft_templates": ["c1"] }),
            ),
            (
                Collection::Sets,
                json!({ "id": "s1", "status": "published", "slug": "first", "collection": "col", "nft_templates": ["c1"] }),
            ),
            (Collection::NftTemplates, json!({ "id": "c1", "status": "published" })),
        ]);
        let (_db, remote, engine) = setup(remote, SyncPolicy::default()).await;
        engine.sync_item(EntityKind::Collection, "col").await.unwrap();
        assert_eq!(engine.cache().ids(EntityKind::Set).await.unwrap(), vec!["s1"]);
        assert_eq!(engine.cache().ids(EntityKind::CollectibleTemplate).await.unwrap(), vec!["c1"]);
        // Related records don't recurse back into the collection.
        assert_eq!(remote.fetch_count(Collection::Collections).await, 1);
        assert_eq!(remote.fetch_count(Collection::Sets).await, 1);

        engine.sync_item(EntityKind::Set, "s1").await.unwrap();
        assert_eq!(remote.fetch_count(Collection::Collections).await, 2);
        assert_eq!(remote.fetch_count(Collection::NftTemplates).await, 2);
    }

    #[tokio::test]
    async fn test_related_records_not_followed_when_disabled() {
        let remote = MockRemote::with_records([(
            Collection::Sets,
            json!({ "id": "s1", "status": "published", "slug": "first", "collection": "col", "nft_templates": ["c1"] }),
        )]);
        let policy = SyncPolicy { follow_related: false, ..SyncPolicy::default() };
        let (_db, remote, engine) = setup(remote, policy).await;
        engine.sync_item(EntityKind::Set, "s1").await.unwrap();
        assert_eq!(remote.total_fetches().await, 1);
    }

    #[tokio::test]
    async fn test_languages_are_keyed_by_code() {
        let remote = MockRemote::with_records([(Collection::Languages, json!({ "code": "fr", "label": "Français" }))]);
        let (_db, _remote, engine) = setup(remote, SyncPolicy::default()).await;
        assert_eq!(engine.sync_item(EntityKind::Language, "fr").await.unwrap(), Change::Upserted);
        assert_eq!(engine.cache().ids(EntityKind::Language).await.unwrap(), vec!["fr"]);
    }

    #[tokio::test]
    async fn test_sync_singleton() {
        let remote = MockRemote::with_records([(Collection::Homepage, json!({ "id": 1 }))]);
        let (_db, _remote, engine) = setup(remote, SyncPolicy::default()).await;
        assert_eq!(engine.sync_item(EntityKind::Homepage, "ignored").await.unwrap(), Change::Upserted);
        assert!(engine.cache().get(EntityKind::Homepage, SINGLETON_ID).await.unwrap().is_some());

        let err = engine.sync_singleton(EntityKind::Tag).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnhandledEntityType(_)));
    }

    #[tokio::test]
    async fn test_sync_all_prunes_missing_records() {
        let remote = MockRemote::with_records([
            (Collection::PackTemplates, pack("p1", "published")),
            (Collection::PackTemplates, pack("p2", "published")),
            (Collection::PackTemplates, pack("p3", "draft")),
        ]);
        let (_db, remote, engine) = setup(remote, policy(OnUnpublish::Purge)).await;
        engine.cache().upsert(EntityKind::PackTemplate, &pack("stale", "published")).await.unwrap();

        let resync = engine.sync_all(EntityKind::PackTemplate).await.unwrap();
        assert_eq!(resync, Resync { fetched: 2, upserted: 2, pruned: 1 });
        assert_eq!(engine.cache().ids(EntityKind::PackTemplate).await.unwrap(), vec!["p1", "p2"]);

        // Unchanged remote content: idempotent.
        let resync = engine.sync_all(EntityKind::PackTemplate).await.unwrap();
        assert_eq!(resync, Resync { fetched: 2, upserted: 2, pruned: 0 });
        assert_eq!(remote.fetch_count(Collection::PackTemplates).await, 2);
    }

    /// Serves a snapshot, then writes a newer record to the cache the way a
    /// webhook handled while the resync is still running would.
    struct WebhookDuringFetch {
        inner: MockRemote,
        cache: Repository,
        record: Json,
    }

    #[async_trait]
    impl RemoteSource for WebhookDuringFetch {
        fn name(&self) -> &str {
            "webhook-during-fetch"
        }

        async fn fetch(
            &self,
            collection: Collection,
            query: &ItemQuery,
        ) -> mirror_remote::error::Result<ItemsResponse> {
            let snapshot = self.inner.fetch(collection, query).await?;
            self.cache.upsert(EntityKind::PackTemplate, &self.record).await.unwrap();
            Ok(snapshot)
        }
    }

    #[tokio::test]
    async fn test_sync_all_keeps_records_synced_during_fetch() {
        for on_unpublish in [OnUnpublish::Hide, OnUnpublish::Purge] {
            let db = Database::connect_in_memory().await.unwrap();
            let cache = Repository::from(&db);
            let remote = WebhookDuringFetch {
                inner: MockRemote::with_records([(Collection::PackTemplates, pack("p1", "published"))]),
                cache: cache.clone(),
                record: pack("p2", "published"),
            };
            let engine = SyncEngine::new(Arc::new(remote), cache, policy(on_unpublish));
            let resync = engine.sync_all(EntityKind::PackTemplate).await.unwrap();
            assert_eq!(resync, Resync { fetched: 1, upserted: 1, pruned: 0 }, "{on_unpublish:?}");
            assert_eq!(engine.cache().count(EntityKind::PackTemplate).await.unwrap(), 2, "{on_unpublish:?}");
        }
    }

    #[tokio::test]
    async fn test_sync_all_retains_by_default() {
        let remote = MockRemote::with_records([(Collection::Tags, json!({ "id": "t1", "slug": "gold" }))]);
        let (_db, _remote, engine) = setup(remote, SyncPolicy::default()).await;
        engine.cache().upsert(EntityKind::Tag, &json!({ "id": "t0", "slug": "silver" })).await.unwrap();
        let resync = engine.sync_all(EntityKind::Tag).await.unwrap();
        assert_eq!(resync.pruned, 0);
        assert_eq!(engine.cache().count(EntityKind::Tag).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_sync_all_keeps_earlier_upserts_on_failure() {
        let remote = MockRemote::with_records([
            (Collection::StaticPage, json!({ "id": "a", "slug": "about" })),
            (Collection::StaticPage, json!({ "id": "b", "slug": "" })),
            (Collection::StaticPage, json!({ "id": "c", "slug": "contact" })),
        ]);
        let (_db, _remote, engine) = setup(remote, policy(OnUnpublish::Purge)).await;
        engine.cache().upsert(EntityKind::Page, &json!({ "id": "old", "slug": "old" })).await.unwrap();
        let err = engine.sync_all(EntityKind::Page).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Cache { retryable: false }));
        // The first record stayed committed, and nothing was pruned.
        assert_eq!(engine.cache().ids(EntityKind::Page).await.unwrap(), vec!["a", "old"]);
    }

    #[tokio::test]
    async fn test_sync_everything_stops_at_first_failure() {
        let remote = MockRemote::with_records([
            (Collection::Languages, json!({ "code": "en-UK" })),
            (Collection::Application, json!({ "id": 1, "currency": "USD" })),
            (Collection::Homepage, json!({ "id": 1 })),
        ]);
        remote.fail_after(Collection::Tags, 0).await;
        let (_db, remote, engine) = setup(remote, SyncPolicy::default()).await;
        let err = engine.sync_everything().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Remote { retryable: true }));
        assert_eq!(engine.cache().count(EntityKind::Language).await.unwrap(), 1);
        assert_eq!(engine.cache().count(EntityKind::Homepage).await.unwrap(), 1);
        assert_eq!(remote.fetch_count(Collection::FrequentlyAskedQuestions).await, 0);
    }

    #[tokio::test]
    async fn test_sync_everything_visits_every_kind() {
        let (_db, remote, engine) = setup(MockRemote::default(), SyncPolicy::default()).await;
        let results = engine.sync_everything().await.unwrap();
        let kinds: Vec<_> = results.iter().map(|(kind, _)| *kind).collect();
        assert_eq!(kinds, EntityKind::ALL.to_vec());
        assert_eq!(remote.total_fetches().await, EntityKind::ALL.len());
    }

    #[tokio::test]
    async fn test_delete_policies() {
        let (_db, _remote, engine) = setup(MockRemote::default(), SyncPolicy::default()).await;
        engine.cache().upsert(EntityKind::PackTemplate, &pack("p1", "published")).await.unwrap();
        let err = engine.delete(EntityKind::PackTemplate, "p1").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnhandledOperation(_)));

        for (on_delete, first, second) in [
            (OnDelete::Retain, Change::Retained, Change::Retained),
            (OnDelete::Hide, Change::Hidden, Change::Unchanged),
            (OnDelete::Purge, Change::Purged, Change::Unchanged),
        ] {
            let policy = SyncPolicy { on_delete, ..SyncPolicy::default() };
            let engine = SyncEngine::new(engine.remote.clone(), engine.cache.clone(), policy);
            assert_eq!(engine.delete(EntityKind::PackTemplate, "p1").await.unwrap(), first);
            assert_eq!(engine.delete(EntityKind::PackTemplate, "p1").await.unwrap(), second);
        }
        assert!(engine.cache().ids(EntityKind::PackTemplate).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remote_failure_is_raised() {
        let remote = MockRemote::default();
        remote.fail_after(Collection::Sets, 0).await;
        let (_db, _remote, engine) = setup(remote, SyncPolicy::default()).await;
        let err = engine.sync_item(EntityKind::Set, "s1").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Remote { .. }));
        assert!(err.is_retryable());
    }
}
