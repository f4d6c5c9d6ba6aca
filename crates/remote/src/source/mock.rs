//! In-memory remote source for testing.

use super::{ItemsResponse, Meta, RemoteSource};
use crate::error::{Error, ErrorKind, Result};
use crate::{Collection, ItemQuery};
use async_trait::async_trait;
use mirror_query::{Condition, Filter, Limit, Value};
use serde_json::Value as Json;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory remote source for testing.
///
/// Records are stored per collection behind a [`RwLock`], so tests can
/// publish, unpublish and edit content between sync calls while the engine
/// holds a shared handle. Only `_eq` and `_in` filters on top-level fields
/// are evaluated; every other condition lets records through.
///
/// # Examples
///
/// ```
/// use mirror_remote::{Collection, ItemQuery, MockRemote, RemoteSource};
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let remote = MockRemote::with_records([
///     (Collection::Tags, json!({ "id": "t1", "slug": "gold" })),
/// ]);
/// let response = remote.fetch(Collection::Tags, &ItemQuery::new()).await?;
/// assert_eq!(response.data.len(), 1);
/// assert_eq!(remote.fetch_count(Collection::Tags).await, 1);
/// # Ok(())
/// # }
/// ```
pub struct MockRemote {
    name: String,
    records: RwLock<HashMap<Collection, Vec<Json>>>,
    fetches: RwLock<HashMap<Collection, usize>>,
    failures: RwLock<HashMap<Collection, usize>>,
}

impl MockRemote {
    /// Create a mock remote pre-populated with records.
    pub fn with_records(records: impl IntoIterator<Item = (Collection, Json)>) -> Self {
        let mut map: HashMap<Collection, Vec<Json>> = HashMap::new();
        for (collection, record) in records {
            map.entry(collection).or_default().push(record);
        }
        Self {
            name: "mock".to_string(),
            records: RwLock::new(map),
            fetches: RwLock::new(HashMap::new()),
            failures: RwLock::new(HashMap::new()),
        }
    }

    /// Change the name of the mock remote.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a record, replacing any record with the same identifier.
    ///
    /// Singleton collections only ever hold the latest record.
    pub async fn put(&self, collection: Collection, record: Json) {
        let mut guard = self.records.write().await;
        let records = guard.entry(collection).or_default();
        if collection.kind().is_some_and(|kind| kind.is_singleton()) {
            records.clear();
        }
        let key = identifier(collection, &record);
        match records.iter_mut().find(|existing| key.is_some() && identifier(collection, existing) == key) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    /// Remove a record by identifier, returning whether it existed.
    pub async fn remove(&self, collection: Collection, key: &str) -> bool {
        let mut guard = self.records.write().await;
        let Some(records) = guard.get_mut(&collection) else {
            return false;
        };
        let before = records.len();
        records.retain(|record| identifier(collection, record).as_deref() != Some(key));
        records.len() != before
    }

    /// Make fetches of `collection` fail once `successes` fetches have succeeded.
    pub async fn fail_after(&self, collection: Collection, successes: usize) {
        self.failures.write().await.insert(collection, successes);
    }

    /// Number of fetches (successful or not) made against `collection`.
    pub async fn fetch_count(&self, collection: Collection) -> usize {
        self.fetches.read().await.get(&collection).copied().unwrap_or(0)
    }

    /// Number of fetches made against any collection.
    pub async fn total_fetches(&self) -> usize {
        self.fetches.read().await.values().sum()
    }
}

impl Default for MockRemote {
    fn default() -> Self {
        Self::with_records([])
    }
}

#[async_trait]
impl RemoteSource for MockRemote {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, collection: Collection, query: &ItemQuery) -> Result<ItemsResponse> {
        let attempt = {
            let mut fetches = self.fetches.write().await;
            let count = fetches.entry(collection).or_default();
            *count += 1;
            *count
        };
        if let Some(successes) = self.failures.read().await.get(&collection)
            && attempt > *successes
        {
            return Err(Error::from(ErrorKind::Network(format!("mock failure fetching {collection}"))));
        }

        let guard = self.records.read().await;
        let all = guard.get(&collection).map(Vec::as_slice).unwrap_or_default();
        let matched: Vec<&Json> =
            all.iter().filter(|record| query.filter.iter().all(|filter| matches(record, filter))).collect();
        let offset = usize::try_from(query.pagination.resolved_offset()).unwrap_or(usize::MAX);
        let limit = match query.pagination.limit {
            Limit::Unbounded => usize::MAX,
            Limit::Rows(rows) => usize::try_from(rows).unwrap_or(usize::MAX),
        };
        let data = matched.iter().skip(offset).take(limit).map(|record| (*record).clone()).collect();
        let meta = (query.total_count || query.filter_count).then(|| Meta {
            filter_count: query.filter_count.then_some(matched.len() as u64),
            total_count: query.total_count.then_some(all.len() as u64),
        });
        Ok(ItemsResponse { data, meta })
    }
}

fn identifier(collection: Collection, record: &Json) -> Option<String> {
    let field = collection.kind().map_or("id", |kind| kind.key_field());
    match record.get(field)? {
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn matches(record: &Json, filter: &Filter) -> bool {
    let found = record.get(&filter.field).unwrap_or(&Json::Null);
    match &filter.condition {
        Condition::Equals(value) => same(found, value),
        Condition::InSet(values) => values.iter().any(|value| same(found, value)),
        _ => true,
    }
}

/// Loose equality: remote keys may be numbers or strings depending on the
/// collection, and webhooks always send strings.
fn same(found: &Json, value: &Value) -> bool {
    match Value::from_json(found) {
        Some(found) => found == *value || (!found.is_null() && found.to_string() == value.to_string()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_query::Sort;
    use serde_json::json;

    fn packs() -> MockRemote {
        MockRemote::with_records([
            (Collection::PackTemplates, json!({ "id": "p1", "status": "published", "slug": "one" })),
            (Collection::PackTemplates, json!({ "id": "p2", "status": "draft", "slug": "two" })),
            (Collection::PackTemplates, json!({ "id": "p3", "status": "published", "slug": "three" })),
        ])
    }

    #[tokio::test]
    async fn test_equals_filter() {
        let remote = packs();
        let response = remote.fetch(Collection::PackTemplates, &ItemQuery::new().published()).await.unwrap();
        let ids: Vec<_> = response.data.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["p1", "p3"]);
    }

    #[tokio::test]
    async fn test_in_set_filter() {
        let remote = packs();
        let query = ItemQuery::new().filter(Filter::in_set("id", ["p2", "p3"]));
        let response = remote.fetch(Collection::PackTemplates, &query).await.unwrap();
        assert_eq!(response.data.len(), 2);
    }

    #[tokio::test]
    async fn test_numeric_keys_match_strings() {
        let remote = MockRemote::with_records([(Collection::NftTemplates, json!({ "id": 7 }))]);
        let query = ItemQuery::new().filter(Filter::eq("id", "7"));
        assert_eq!(remote.fetch(Collection::NftTemplates, &query).await.unwrap().data.len(), 1);
    }

    #[tokio::test]
    async fn test_other_conditions_pass_through() {
        let remote = packs();
        let query = ItemQuery::new().filter(Filter::new("slug", Condition::GreaterThan("zzz".into()))).sort(Sort::desc("slug"));
        assert_eq!(remote.fetch(Collection::PackTemplates, &query).await.unwrap().data.len(), 3);
    }

    #[tokio::test]
    async fn test_limit_and_meta() {
        let remote = packs();
        let mut query = ItemQuery::new().published().limit(Limit::Rows(1)).with_total_count();
        query.filter_count = true;
        let response = remote.fetch(Collection::PackTemplates, &query).await.unwrap();
        assert_eq!(response.data.len(), 1);
        assert_eq!(response.meta, Some(Meta { filter_count: Some(2), total_count: Some(3) }));
    }

    #[tokio::test]
    async fn test_put_replaces_by_identifier() {
        let remote = packs();
        remote.put(Collection::PackTemplates, json!({ "id": "p2", "status": "published", "slug": "two" })).await;
        let response = remote.fetch(Collection::PackTemplates, &ItemQuery::new().published()).await.unwrap();
        assert_eq!(response.data.len(), 3);

        remote.put(Collection::Languages, json!({ "code": "fr" })).await;
        remote.put(Collection::Languages, json!({ "code": "fr", "label": "French" })).await;
        let response = remote.fetch(Collection::Languages, &ItemQuery::new()).await.unwrap();
        assert_eq!(response.data, vec![json!({ "code": "fr", "label": "French" })]);
    }

    #[tokio::test]
    async fn test_singletons_hold_one_record() {
        let remote = MockRemote::default();
        remote.put(Collection::Homepage, json!({ "id": 1 })).await;
        remote.put(Collection::Homepage, json!({ "id": 2 })).await;
        let response = remote.fetch(Collection::Homepage, &ItemQuery::new()).await.unwrap();
        assert_eq!(response.data, vec![json!({ "id": 2 })]);
    }

    #[tokio::test]
    async fn test_remove() {
        let remote = packs();
        assert!(remote.remove(Collection::PackTemplates, "p1").await);
        assert!(!remote.remove(Collection::PackTemplates, "p1").await);
        assert!(!remote.remove(Collection::Sets, "s1").await);
    }

    #[tokio::test]
    async fn test_fail_after() {
        let remote = packs();
        remote.fail_after(Collection::PackTemplates, 1).await;
        assert!(remote.fetch(Collection::PackTemplates, &ItemQuery::new()).await.is_ok());
        let err = remote.fetch(Collection::PackTemplates, &ItemQuery::new()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Network(_)));
        assert!(err.is_retryable());
        // Other collections are unaffected.
        assert!(remote.fetch(Collection::Sets, &ItemQuery::new()).await.is_ok());
        assert_eq!(remote.fetch_count(Collection::PackTemplates).await, 2);
        assert_eq!(remote.total_fetches().await, 3);
    }
}
