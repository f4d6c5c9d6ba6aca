use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Sort direction for a single [`Sort`] entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "asc", alias = "ascending", alias = "ASC")]
    Ascending,
    #[serde(rename = "desc", alias = "descending", alias = "DESC")]
    Descending,
}

impl Direction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// One entry of an ordered sort list.
///
/// Accepts either the remote shorthand (`"releasedAt"`, `"-releasedAt"`) or
/// an explicit object (`{"field": "releasedAt", "order": "desc"}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SortRepr")]
pub struct Sort {
    pub field: String,
    #[serde(rename = "order")]
    pub direction: Direction,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SortRepr {
    Short(String),
    Long {
        field: String,
        #[serde(default, alias = "direction")]
        order: Direction,
    },
}

impl From<SortRepr> for Sort {
    fn from(repr: SortRepr) -> Self {
        match repr {
            SortRepr::Short(s) => Self::from_shorthand(&s),
            SortRepr::Long { field, order } => Self { field, direction: order },
        }
    }
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: Direction::Ascending }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: Direction::Descending }
    }

    fn from_shorthand(s: &str) -> Self {
        let s = s.trim();
        match s.strip_prefix('-') {
            Some(field) => Self::desc(field),
            None => Self::asc(s.strip_prefix('+').unwrap_or(s)),
        }
    }
}

impl FromStr for Sort {
    type Err = Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_shorthand(s))
    }
}

/// Renders the remote shorthand (`-field` when descending).
impl Display for Sort {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.direction {
            Direction::Ascending => write!(f, "{}", self.field),
            Direction::Descending => write!(f, "-{}", self.field),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!("releasedAt"), Sort::asc("releasedAt"))]
    #[case(json!("-releasedAt"), Sort::desc("releasedAt"))]
    #[case(json!({ "field": "slug", "order": "desc" }), Sort::desc("slug"))]
    #[case(json!({ "field": "slug", "direction": "ascending" }), Sort::asc("slug"))]
    #[case(json!({ "field": "slug" }), Sort::asc("slug"))]
    fn test_deserialize(#[case] input: serde_json::Value, #[case] expected: Sort) {
        assert_eq!(serde_json::from_value::<Sort>(input).unwrap(), expected);
    }

    #[test]
    fn test_shorthand_round_trip() {
        let sort: Sort = "-price".parse().unwrap();
        assert_eq!(sort.to_string(), "-price");
        assert_eq!(Sort::asc("price").to_string(), "price");
    }

    #[test]
    fn test_serialize_object() {
        assert_eq!(serde_json::to_value(Sort::desc("sort")).unwrap(), json!({ "field": "sort", "order": "desc" }));
    }
}
