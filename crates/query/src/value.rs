use crate::timestamp;
use serde_json::Value as Json;
use std::fmt::{Display, Formatter, Result as FmtResult};
use time::OffsetDateTime;

/// A scalar operand of a filter condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(OffsetDateTime),
}

impl Value {
    /// Convert a JSON scalar. Arrays and objects are not scalars and yield `None`.
    pub fn from_json(json: &Json) -> Option<Self> {
        Some(match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64()?),
            },
            Json::String(s) => Self::Text(s.clone()),
            Json::Array(_) | Json::Object(_) => return None,
        })
    }

    pub fn to_json(&self) -> Json {
        match self {
            Self::Null => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Integer(i) => Json::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f).map_or(Json::Null, Json::Number),
            Self::Text(s) => Json::String(s.clone()),
            Self::Timestamp(t) => timestamp::format(*t).map_or(Json::Null, Json::String),
        }
    }

    /// Interpret the value as a point in time.
    ///
    /// Integers are unix timestamps in seconds; text goes through the lenient
    /// [`timestamp::parse`].
    pub fn as_timestamp(&self) -> Option<OffsetDateTime> {
        match self {
            Self::Timestamp(t) => Some(*t),
            Self::Integer(i) => OffsetDateTime::from_unix_timestamp(*i).ok(),
            Self::Text(s) => timestamp::parse(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}
impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}
impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}
impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}
impl From<OffsetDateTime> for Value {
    fn from(value: OffsetDateTime) -> Self {
        Self::Timestamp(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(Value::from_json(&json!(null)), Some(Value::Null));
        assert_eq!(Value::from_json(&json!(true)), Some(Value::Bool(true)));
        assert_eq!(Value::from_json(&json!(42)), Some(Value::Integer(42)));
        assert_eq!(Value::from_json(&json!(1.5)), Some(Value::Float(1.5)));
        assert_eq!(Value::from_json(&json!("auction")), Some(Value::from("auction")));
    }

    #[test]
    fn test_from_json_rejects_containers() {
        assert_eq!(Value::from_json(&json!([1, 2])), None);
        assert_eq!(Value::from_json(&json!({ "a": 1 })), None);
    }

    #[test]
    fn test_timestamp_serializes_as_rfc3339() {
        let value = Value::from(datetime!(2024-05-01 08:00:00 UTC));
        assert_eq!(value.to_json(), json!("2024-05-01T08:00:00Z"));
    }

    #[test]
    fn test_as_timestamp() {
        let expected = datetime!(2024-05-01 08:00:00 UTC);
        assert_eq!(Value::from("2024-05-01T08:00:00").as_timestamp(), Some(expected));
        assert_eq!(Value::Integer(expected.unix_timestamp()).as_timestamp(), Some(expected));
        assert_eq!(Value::Bool(true).as_timestamp(), None);
    }
}
