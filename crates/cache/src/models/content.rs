use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use time::OffsetDateTime;

#[derive(sqlx::FromRow)]
pub(crate) struct ContentRow {
    pub(crate) id: String,
    pub(crate) content: String,
    pub(crate) created_at: i64,
    pub(crate) updated_at: i64,
}

/// A cached record exactly as it was last observed on the remote source.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedRow {
    pub id: String,
    pub content: serde_json::Value,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<ContentRow> for CachedRow {
    type Error = Error;
    fn try_from(row: ContentRow) -> Result<Self, Self::Error> {
        let invalid = |what: &str| ErrorKind::InvalidData(format!("{what} of cached row {}", row.id));
        Ok(Self {
            content: serde_json::from_str(&row.content).or_raise(|| invalid("content"))?,
            created_at: OffsetDateTime::from_unix_timestamp(row.created_at).or_raise(|| invalid("creation date"))?,
            updated_at: OffsetDateTime::from_unix_timestamp(row.updated_at).or_raise(|| invalid("update date"))?,
            id: row.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_to_model() {
        let row = ContentRow {
            id: "pack-1".to_string(),
            content: r#"{"id":"pack-1","slug":"starter"}"#.to_string(),
            created_at: 1704067200,
            updated_at: 1704153600,
        };
        let cached = CachedRow::try_from(row).unwrap();
        assert_eq!(cached.id, "pack-1");
        assert_eq!(cached.content, json!({ "id": "pack-1", "slug": "starter" }));
        assert_eq!(cached.updated_at.unix_timestamp() - cached.created_at.unix_timestamp(), 86400);
    }

    #[test]
    fn test_corrupt_content() {
        let row = ContentRow { id: "x".to_string(), content: "{".to_string(), created_at: 0, updated_at: 0 };
        let err = CachedRow::try_from(row).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData(message) if message == "content of cached row x"));
    }
}
