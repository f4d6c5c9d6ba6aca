//! Translates portable [`Query`] descriptions into SQL against a cache table.
//!
//! Translation is a pure function of the table layout, the query and the
//! current time (needed for the virtual pack `status` field). Nothing here
//! touches the database; the reader binds and executes the result.
//!
//! Range conditions are null-inclusive: `releasedAt > x` also matches rows
//! without a `released_at`. Callers that need a strict range must add their
//! own non-null condition first.

use crate::error::{ErrorKind, Result};
use crate::schema::{Column, ColumnKind, Table};
use mirror_content::models::PackStatus;
use mirror_content::raw::PackType;
use mirror_query::{Condition, Filter, Limit, Query, Value};
use sqlx::Sqlite;
use sqlx::query::Query as SqlxQuery;
use sqlx::sqlite::SqliteArguments;
use time::OffsetDateTime;

/// Columns every page query selects, matching the cached row model.
const SELECT_COLUMNS: &str = "id, content, created_at, updated_at";

/// A bound parameter of a translated query.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Integer(i64),
    Real(f64),
    Text(String),
}

/// A SQL statement and its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<Param>,
}

impl SqlQuery {
    /// Prepare the statement with every parameter bound, ready to execute.
    pub(crate) fn prepare(&self) -> SqlxQuery<'_, Sqlite, SqliteArguments<'_>> {
        self.params.iter().fold(sqlx::query(&self.sql), |query, param| match param {
            Param::Integer(i) => query.bind(*i),
            Param::Real(f) => query.bind(*f),
            Param::Text(s) => query.bind(s.as_str()),
        })
    }
}

/// The page query and, when a total count was requested, the count query.
#[derive(Debug, Clone, PartialEq)]
pub struct Translated {
    pub page: SqlQuery,
    pub count: Option<SqlQuery>,
}

/// Accumulates a conjunction of predicates and their parameters.
#[derive(Debug, Default)]
struct Predicates {
    clauses: Vec<String>,
    params: Vec<Param>,
}

impl Predicates {
    fn push(&mut self, clause: impl Into<String>, params: impl IntoIterator<Item = Param>) {
        self.clauses.push(clause.into());
        self.params.extend(params);
    }

    fn where_clause(&self) -> String {
        self.clauses.join(" AND ")
    }
}

/// Translate `query` into SQL against `table`.
pub fn translate(table: &Table, query: &Query, now: OffsetDateTime) -> Result<Translated> {
    let mut predicates = Predicates::default();
    predicates.push("deleted_at IS NULL", []);
    for filter in &query.filter {
        push_filter(&mut predicates, table, filter, now)?;
    }
    let where_clause = predicates.where_clause();

    let count = query.total_count.then(|| SqlQuery {
        sql: format!("SELECT COUNT(*) FROM {} WHERE {where_clause}", table.name),
        params: predicates.params.clone(),
    });

    let mut sql = format!("SELECT {SELECT_COLUMNS} FROM {} WHERE {where_clause}", table.name);
    let mut params = predicates.params;
    let order_by = order_by(table, query);
    if !order_by.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&order_by.join(", "));
    }
    let offset = to_sql_int("offset", query.pagination.resolved_offset())?;
    match query.pagination.limit {
        Limit::Rows(rows) => {
            sql.push_str(" LIMIT ? OFFSET ?");
            params.push(Param::Integer(to_sql_int("limit", rows)?));
            params.push(Param::Integer(offset));
        },
        // SQLite only accepts OFFSET after a LIMIT; a negative limit means "no limit".
        Limit::Unbounded if offset > 0 => {
            sql.push_str(" LIMIT -1 OFFSET ?");
            params.push(Param::Integer(offset));
        },
        Limit::Unbounded => {},
    }

    Ok(Translated { page: SqlQuery { sql, params }, count })
}

fn to_sql_int(field: &'static str, value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| ErrorKind::invalid_query(field, "value is out of range").into())
}

fn order_by(table: &Table, query: &Query) -> Vec<String> {
    query
        .sort
        .iter()
        .filter_map(|sort| match table.column(&sort.field) {
            Some(column) => Some(format!("\"{}\" {}", column.column, sort.direction.as_sql())),
            None => {
                tracing::warn!(table = table.name, field = %sort.field, "Ignoring sort on unknown field");
                None
            },
        })
        .collect()
}

fn push_filter(predicates: &mut Predicates, table: &Table, filter: &Filter, now: OffsetDateTime) -> Result<()> {
    if table.pack_status && filter.field == "status" {
        return push_status(predicates, filter, now);
    }
    let Some(column) = table.column(&filter.field) else {
        tracing::warn!(table = table.name, field = %filter.field, "Ignoring filter on unknown field");
        return Ok(());
    };
    if column.kind == ColumnKind::TagList {
        return push_tag_membership(predicates, table, column, filter);
    }
    let col = format!("\"{}\"", column.column);
    match &filter.condition {
        Condition::Equals(Value::Null) => predicates.push(format!("{col} IS NULL"), []),
        Condition::Equals(value) => predicates.push(format!("{col} = ?"), [coerce(column, value)?]),
        Condition::InSet(values) => {
            let (params, has_null) = coerce_set(column, values)?;
            let clause = match (params.is_empty(), has_null) {
                (true, false) => "0".to_string(),
                (true, true) => format!("{col} IS NULL"),
                (false, false) => format!("{col} IN ({})", placeholders(params.len())),
                (false, true) => format!("({col} IN ({}) OR {col} IS NULL)", placeholders(params.len())),
            };
            predicates.push(clause, params);
        },
        Condition::NotInSet(values) => {
            let (params, has_null) = coerce_set(column, values)?;
            if has_null {
                predicates.push(format!("{col} IS NOT NULL"), []);
            }
            if !params.is_empty() {
                predicates.push(format!("{col} NOT IN ({})", placeholders(params.len())), params);
            }
        },
        Condition::GreaterThan(value)
        | Condition::LessThan(value)
        | Condition::GreaterOrEqual(value)
        | Condition::LessOrEqual(value) => {
            if value.is_null() {
                exn::bail!(ErrorKind::invalid_query(&filter.field, "range bound must not be null"));
            }
            let op = range_operator(&filter.condition);
            predicates.push(format!("({col} IS NULL OR {col} {op} ?)"), [coerce(column, value)?]);
        },
    }
    Ok(())
}

fn range_operator(condition: &Condition) -> &'static str {
    match condition {
        Condition::GreaterThan(_) => ">",
        Condition::LessThan(_) => "<",
        Condition::GreaterOrEqual(_) => ">=",
        Condition::LessOrEqual(_) => "<=",
        Condition::Equals(_) | Condition::InSet(_) | Condition::NotInSet(_) => "=",
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Coerce set members, separating out `null` (which SQL `IN` never matches).
fn coerce_set(column: &Column, values: &[Value]) -> Result<(Vec<Param>, bool)> {
    let has_null = values.iter().any(Value::is_null);
    let params = values.iter().filter(|v| !v.is_null()).map(|v| coerce(column, v)).collect::<Result<Vec<_>>>()?;
    Ok((params, has_null))
}

/// Coerce a filter operand to the storage type of `column`.
///
/// Refusing a value is always preferable to silently widening a predicate.
fn coerce(column: &Column, value: &Value) -> Result<Param> {
    let invalid = |reason| exn::Exn::from(ErrorKind::invalid_query(column.field, reason));
    Ok(match (column.kind, value) {
        (ColumnKind::Text | ColumnKind::TagList, Value::Text(s)) => Param::Text(s.clone()),
        // Remote keys may be numeric but are always stored as text.
        (ColumnKind::Text | ColumnKind::TagList, Value::Integer(i)) => Param::Text(i.to_string()),
        (ColumnKind::Text | ColumnKind::TagList, _) => return Err(invalid("expected text")),
        (ColumnKind::Integer, Value::Integer(i)) => Param::Integer(*i),
        (ColumnKind::Integer, Value::Bool(b)) => Param::Integer(i64::from(*b)),
        (ColumnKind::Integer | ColumnKind::Real, Value::Float(f)) => Param::Real(*f),
        (ColumnKind::Integer, Value::Text(s)) => match s.trim().parse::<i64>() {
            Ok(i) => Param::Integer(i),
            Err(_) => return Err(invalid("expected an integer")),
        },
        (ColumnKind::Integer, _) => return Err(invalid("expected an integer")),
        (ColumnKind::Real, Value::Integer(i)) => Param::Integer(*i),
        (ColumnKind::Real, Value::Text(s)) => match s.trim().parse::<f64>() {
            Ok(f) => Param::Real(f),
            Err(_) => return Err(invalid("expected a number")),
        },
        (ColumnKind::Real, _) => return Err(invalid("expected a number")),
        (ColumnKind::Timestamp, value) => match value.as_timestamp() {
            Some(t) => Param::Integer(t.unix_timestamp()),
            None => return Err(invalid("expected a timestamp")),
        },
    })
}

/// Membership tests against a JSON array column.
fn push_tag_membership(predicates: &mut Predicates, table: &Table, column: &Column, filter: &Filter) -> Result<()> {
    let exists = |params: usize| {
        format!(
            "EXISTS (SELECT 1 FROM json_each({}.\"{}\") WHERE json_each.value IN ({}))",
            table.name,
            column.column,
            placeholders(params)
        )
    };
    match &filter.condition {
        Condition::Equals(value) if !value.is_null() => predicates.push(exists(1), [coerce(column, value)?]),
        Condition::InSet(values) => {
            let (params, _) = coerce_set(column, values)?;
            match params.is_empty() {
                true => predicates.push("0", []),
                false => predicates.push(exists(params.len()), params),
            }
        },
        Condition::NotInSet(values) => {
            let (params, _) = coerce_set(column, values)?;
            if !params.is_empty() {
                predicates.push(format!("NOT {}", exists(params.len())), params);
            }
        },
        condition => {
            tracing::warn!(
                table = table.name,
                field = column.field,
                operator = condition.operator(),
                "Ignoring unsupported condition on a tag list"
            );
        },
    }
    Ok(())
}

/// The time-derived pack status, consistent with [`PackStatus::at`].
fn push_status(predicates: &mut Predicates, filter: &Filter, now: OffsetDateTime) -> Result<()> {
    let wanted = match &filter.condition {
        Condition::Equals(value) => vec![parse_status(value)?],
        Condition::InSet(values) => values.iter().map(parse_status).collect::<Result<Vec<_>>>()?,
        Condition::NotInSet(values) => {
            let excluded = values.iter().map(parse_status).collect::<Result<Vec<_>>>()?;
            PackStatus::ALL.into_iter().filter(|s| !excluded.contains(s)).collect()
        },
        condition => {
            tracing::warn!(field = "status", operator = condition.operator(), "Ignoring range condition on pack status");
            return Ok(());
        },
    };
    if PackStatus::ALL.iter().all(|s| wanted.contains(s)) {
        return Ok(());
    }
    if wanted.is_empty() {
        predicates.push("0", []);
        return Ok(());
    }
    let now = now.unix_timestamp();
    let mut clauses = Vec::with_capacity(wanted.len());
    let mut params = Vec::new();
    for status in PackStatus::ALL.into_iter().filter(|s| wanted.contains(s)) {
        let (clause, bound) = status_predicate(status);
        clauses.push(clause);
        params.extend(std::iter::repeat_n(Param::Integer(now), bound));
    }
    predicates.push(format!("({})", clauses.join(" OR ")), params);
    Ok(())
}

/// SQL for one status and how many times `now` must be bound for it.
fn status_predicate(status: PackStatus) -> (String, usize) {
    let auction = PackType::Auction.as_str();
    match status {
        PackStatus::Upcoming => (
            format!("(\"type\" = '{auction}' AND auction_until IS NOT NULL AND released_at > ?)"),
            1,
        ),
        PackStatus::Active => (
            format!("(\"type\" <> '{auction}' OR (released_at <= ? AND auction_until > ?))"),
            2,
        ),
        PackStatus::Expired => (
            format!(
                "(\"type\" = '{auction}' AND (released_at IS NULL OR auction_until IS NULL \
                 OR (released_at <= ? AND auction_until <= ?)))"
            ),
            2,
        ),
    }
}

fn parse_status(value: &Value) -> Result<PackStatus> {
    value
        .as_str()
        .and_then(|s| s.parse::<PackStatus>().ok())
        .ok_or_else(|| ErrorKind::invalid_query("status", "expected upcoming, active or expired").into())
}
