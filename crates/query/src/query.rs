use crate::{Filter, FilterSet, Limit, Pagination, Sort};
use serde::{Deserialize, Serialize};

/// A portable description of a filtered, sorted, paginated read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    #[serde(default, skip_serializing_if = "FilterSet::is_empty")]
    pub filter: FilterSet,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<Sort>,
    #[serde(flatten)]
    pub pagination: Pagination,
    /// Also compute the number of rows matching `filter`, ignoring pagination.
    #[serde(default)]
    pub total_count: bool,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter.push(filter);
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn limit(mut self, limit: Limit) -> Self {
        self.pagination.limit = limit;
        self
    }

    pub fn page(mut self, page: u64, rows: u64) -> Self {
        self.pagination = Pagination::page(page, rows);
        self
    }

    pub fn with_total_count(mut self) -> Self {
        self.total_count = true;
        self
    }
}
