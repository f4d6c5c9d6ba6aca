//! Filter trees.
//!
//! On the wire a filter is a map from field name to a map of operator to
//! operand (`{"price": {"_gte": 10, "_lt": 50}}`). Internally each
//! field/operator pair becomes one [`Filter`] whose [`Condition`] is a closed
//! sum type, so consumers can match exhaustively and never see an operator
//! they don't understand.
//!
//! Operators this crate doesn't know are dropped while parsing (and logged).
//! Callers must not rely on an unknown operator to restrict a result set.

use crate::Value;
use crate::error::{ErrorKind, Result};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as Json};

/// One supported comparison and its operand(s).
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `_eq`
    Equals(Value),
    /// `_in`
    InSet(Vec<Value>),
    /// `_nin`
    NotInSet(Vec<Value>),
    /// `_gt`
    GreaterThan(Value),
    /// `_lt`
    LessThan(Value),
    /// `_gte`
    GreaterOrEqual(Value),
    /// `_lte`
    LessOrEqual(Value),
}

impl Condition {
    /// The wire name of the operator.
    pub fn operator(&self) -> &'static str {
        match self {
            Self::Equals(_) => "_eq",
            Self::InSet(_) => "_in",
            Self::NotInSet(_) => "_nin",
            Self::GreaterThan(_) => "_gt",
            Self::LessThan(_) => "_lt",
            Self::GreaterOrEqual(_) => "_gte",
            Self::LessOrEqual(_) => "_lte",
        }
    }

    /// Whether this is one of the four one-sided range comparisons.
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            Self::GreaterThan(_) | Self::LessThan(_) | Self::GreaterOrEqual(_) | Self::LessOrEqual(_)
        )
    }

    /// Parse an operator/operand pair. Returns `Ok(None)` for unknown operators.
    fn parse(field: &str, operator: &str, operand: &Json) -> Result<Option<Self>> {
        let scalar = || {
            Value::from_json(operand)
                .ok_or_else(|| exn::Exn::from(ErrorKind::invalid(field, "operand must be a scalar")))
        };
        let list = || -> Result<Vec<Value>> {
            let Json::Array(items) = operand else {
                exn::bail!(ErrorKind::invalid(field, "set operand must be an array"));
            };
            items
                .iter()
                .map(|item| {
                    Value::from_json(item)
                        .ok_or_else(|| exn::Exn::from(ErrorKind::invalid(field, "set members must be scalars")))
                })
                .collect()
        };
        Ok(Some(match operator {
            "_eq" => Self::Equals(scalar()?),
            "_in" => Self::InSet(list()?),
            "_nin" => Self::NotInSet(list()?),
            "_gt" => Self::GreaterThan(scalar()?),
            "_lt" => Self::LessThan(scalar()?),
            "_gte" => Self::GreaterOrEqual(scalar()?),
            "_lte" => Self::LessOrEqual(scalar()?),
            _ => return Ok(None),
        }))
    }

    fn operand_json(&self) -> Json {
        match self {
            Self::Equals(v)
            | Self::GreaterThan(v)
            | Self::LessThan(v)
            | Self::GreaterOrEqual(v)
            | Self::LessOrEqual(v) => v.to_json(),
            Self::InSet(values) | Self::NotInSet(values) => Json::Array(values.iter().map(Value::to_json).collect()),
        }
    }
}

/// A single condition applied to a named field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub condition: Condition,
}

impl Filter {
    pub fn new(field: impl Into<String>, condition: Condition) -> Self {
        Self { field: field.into(), condition }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Condition::Equals(value.into()))
    }

    pub fn in_set<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self::new(field, Condition::InSet(values.into_iter().map(Into::into).collect()))
    }
}

/// A conjunction of filters, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet(Vec<Filter>);

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filter: Filter) {
        self.0.push(filter);
    }

    /// Builder-style [`push`](Self::push).
    pub fn with(mut self, filter: Filter) -> Self {
        self.push(filter);
        self
    }

    /// Append every filter of `other`.
    pub fn extend(&mut self, other: FilterSet) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Filter> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Find the first condition for `field`.
    pub fn get(&self, field: &str) -> Option<&Condition> {
        self.0.iter().find(|f| f.field == field).map(|f| &f.condition)
    }

    /// Parse the nested map representation.
    ///
    /// Conditions come out ordered by field name (then operator name), not
    /// in the order the JSON object spelled them, so equal filters always
    /// translate to the same SQL.
    pub fn from_json(json: &Json) -> Result<Self> {
        let Json::Object(fields) = json else {
            exn::bail!(ErrorKind::invalid("filter", "must be an object"));
        };
        let mut set = Self::new();
        for (field, operators) in fields {
            let Json::Object(operators) = operators else {
                exn::bail!(ErrorKind::invalid(field.as_str(), "conditions must be an object of operators"));
            };
            for (operator, operand) in operators {
                match Condition::parse(field, operator, operand)? {
                    Some(condition) => set.push(Filter::new(field.as_str(), condition)),
                    None => tracing::warn!(field, operator, "Ignoring unsupported filter operator"),
                }
            }
        }
        Ok(set)
    }

    /// Render the nested map representation, merging conditions on the same field.
    pub fn to_json(&self) -> Json {
        let mut fields = Map::new();
        for filter in &self.0 {
            let entry = fields.entry(filter.field.clone()).or_insert_with(|| Json::Object(Map::new()));
            if let Json::Object(operators) = entry {
                operators.insert(filter.condition.operator().to_string(), filter.condition.operand_json());
            }
        }
        Json::Object(fields)
    }
}

impl FromIterator<Filter> for FilterSet {
    fn from_iter<I: IntoIterator<Item = Filter>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a FilterSet {
    type Item = &'a Filter;
    type IntoIter = std::slice::Iter<'a, Filter>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for FilterSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FilterSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let json = Json::deserialize(deserializer)?;
        FilterSet::from_json(&json).map_err(|err| D::Error::custom(&*err))
    }
}
