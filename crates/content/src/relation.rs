use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// A remote record identifier.
///
/// Most collections use UUID strings, but junction and translation rows use
/// auto-incrementing integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Text(String),
    Number(i64),
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(number) => write!(f, "{number}"),
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

/// Records that know their own remote identifier.
pub trait HasKey {
    fn key(&self) -> &Key;
}

/// A to-one relation: a bare identifier unless the field selection asked for
/// the related record to be expanded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Relation<T> {
    Id(Key),
    Expanded(Box<T>),
}

impl<T> Relation<T> {
    pub fn expanded(&self) -> Option<&T> {
        match self {
            Self::Expanded(record) => Some(record),
            Self::Id(_) => None,
        }
    }

    /// The identifier, but only when the relation was left unexpanded.
    pub fn as_key(&self) -> Option<&Key> {
        match self {
            Self::Id(key) => Some(key),
            Self::Expanded(_) => None,
        }
    }
}

impl<T: HasKey> Relation<T> {
    /// The identifier of the related record, whichever shape it arrived in.
    pub fn id(&self) -> String {
        match self {
            Self::Id(key) => key.to_string(),
            Self::Expanded(record) => record.key().to_string(),
        }
    }
}

/// A to-many relation.
///
/// Depending on the field selection the remote service returns the related
/// identifiers, the expanded records, or (for aggregate selections) only a
/// count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationList<T> {
    Items(Vec<Relation<T>>),
    Count(u64),
}

impl<T> Default for RelationList<T> {
    fn default() -> Self {
        Self::Items(Vec::new())
    }
}

impl<T> RelationList<T> {
    /// Every entry, expanded or not. A count has no entries.
    pub fn items(&self) -> &[Relation<T>] {
        match self {
            Self::Items(items) => items,
            Self::Count(_) => &[],
        }
    }

    /// Expanded entries only; bare identifiers are skipped.
    pub fn expanded(&self) -> impl Iterator<Item = &T> {
        self.items().iter().filter_map(Relation::expanded)
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }
}

impl<T: HasKey> RelationList<T> {
    pub fn ids(&self) -> Vec<String> {
        self.items().iter().map(Relation::id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Thing {
        id: Key,
        name: String,
    }

    impl HasKey for Thing {
        fn key(&self) -> &Key {
            &self.id
        }
    }

    #[test]
    fn test_relation_bare_id() {
        let relation: Relation<Thing> = serde_json::from_value(json!("abc")).unwrap();
        assert_eq!(relation.as_key(), Some(&Key::from("abc")));
        assert!(relation.expanded().is_none());
        assert_eq!(relation.id(), "abc");
    }

    #[test]
    fn test_relation_expanded() {
        let relation: Relation<Thing> = serde_json::from_value(json!({ "id": 7, "name": "seven" })).unwrap();
        assert_eq!(relation.expanded().map(|thing| thing.name.as_str()), Some("seven"));
        assert!(relation.as_key().is_none());
        assert_eq!(relation.id(), "7");
    }

    #[test]
    fn test_relation_list_mixed() {
        let list: RelationList<Thing> =
            serde_json::from_value(json!(["a", { "id": "b", "name": "bee" }, 3])).unwrap();
        assert_eq!(list.ids(), vec!["a", "b", "3"]);
        assert_eq!(list.expanded().count(), 1);
    }

    #[test]
    fn test_relation_list_count() {
        let list: RelationList<Thing> = serde_json::from_value(json!(4)).unwrap();
        assert_eq!(list, RelationList::Count(4));
        assert!(list.is_empty());
        assert!(list.ids().is_empty());
    }
}
