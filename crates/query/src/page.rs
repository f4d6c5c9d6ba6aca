use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Maximum number of rows to return.
///
/// The wire value `-1` (and an absent value) means [`Limit::Unbounded`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Limit {
    #[default]
    Unbounded,
    Rows(u64),
}

impl Limit {
    /// Interpret the wire representation. Only `-1` may be negative.
    pub fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            -1 => Some(Self::Unbounded),
            n => u64::try_from(n).ok().map(Self::Rows),
        }
    }

    pub fn as_raw(&self) -> i64 {
        match self {
            Self::Unbounded => -1,
            Self::Rows(n) => i64::try_from(*n).unwrap_or(i64::MAX),
        }
    }
}

impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_raw())
    }
}

impl<'de> Deserialize<'de> for Limit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Limit::from_raw(raw).ok_or_else(|| D::Error::custom("limit must be -1 or a non-negative integer"))
    }
}

/// The window of results to return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// One-based page number. Only meaningful with a bounded limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(default)]
    pub limit: Limit,
    /// Explicit row offset, used when no page is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

impl Pagination {
    /// One page of `rows` results.
    pub fn page(page: u64, rows: u64) -> Self {
        Self { page: Some(page), limit: Limit::Rows(rows), offset: None }
    }

    /// The number of rows to skip.
    ///
    /// A page number wins over an explicit offset, but only when the limit is
    /// bounded: "page 3 of everything" is meaningless. Page `0` is page `1`.
    pub fn resolved_offset(&self) -> u64 {
        match (self.page, self.limit) {
            (Some(page), Limit::Rows(rows)) => page.saturating_sub(1).saturating_mul(rows),
            _ => self.offset.unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(-1, Some(Limit::Unbounded))]
    #[case(0, Some(Limit::Rows(0)))]
    #[case(25, Some(Limit::Rows(25)))]
    #[case(-2, None)]
    fn test_limit_from_raw(#[case] raw: i64, #[case] expected: Option<Limit>) {
        assert_eq!(Limit::from_raw(raw), expected);
    }

    #[rstest]
    #[case(Pagination::page(2, 10), 10)]
    #[case(Pagination::page(1, 10), 0)]
    #[case(Pagination::page(0, 10), 0)]
    #[case(Pagination { page: Some(3), limit: Limit::Unbounded, offset: None }, 0)]
    #[case(Pagination { page: None, limit: Limit::Rows(5), offset: Some(7) }, 7)]
    #[case(Pagination { page: Some(2), limit: Limit::Rows(5), offset: Some(7) }, 5)]
    #[case(Pagination::default(), 0)]
    fn test_resolved_offset(#[case] pagination: Pagination, #[case] expected: u64) {
        assert_eq!(pagination.resolved_offset(), expected);
    }

    #[test]
    fn test_limit_rejects_other_negatives() {
        assert!(serde_json::from_str::<Limit>("-5").is_err());
        assert_eq!(serde_json::from_str::<Limit>("-1").unwrap(), Limit::Unbounded);
    }
}
