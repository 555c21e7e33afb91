//! The declarative search descriptor.
//!
//! A `Criteria` collects filters, sorting, paging, requested associations and
//! aggregations, and serializes to the plain object the search endpoints
//! expect. Cloning a criteria branches it for nested associations without
//! aliasing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// How the server should compute the result's total count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalCountMode {
    /// No total.
    None,
    /// Exact total.
    Exact,
    /// Only whether more pages exist.
    NextPages,
}

impl TotalCountMode {
    fn as_number(self) -> u64 {
        match self {
            Self::None => 0,
            Self::Exact => 1,
            Self::NextPages => 2,
        }
    }
}

/// Boolean combination operator for `multi`/`not` filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoolOperator {
    And,
    Or,
}

/// A search filter in the wire shape the search endpoints accept.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Filter {
    Equals {
        field: String,
        value: Value,
    },
    EqualsAny {
        field: String,
        value: Vec<Value>,
    },
    Contains {
        field: String,
        value: Value,
    },
    Prefix {
        field: String,
        value: Value,
    },
    Suffix {
        field: String,
        value: Value,
    },
    Range {
        field: String,
        parameters: BTreeMap<String, Value>,
    },
    Not {
        operator: BoolOperator,
        queries: Vec<Filter>,
    },
    Multi {
        operator: BoolOperator,
        queries: Vec<Filter>,
    },
}

impl Filter {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn equals_any(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::EqualsAny {
            field: field.into(),
            value: values,
        }
    }

    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Contains {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn prefix(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Prefix {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn suffix(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Suffix {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn range(field: impl Into<String>, parameters: BTreeMap<String, Value>) -> Self {
        Self::Range {
            field: field.into(),
            parameters,
        }
    }

    pub fn not(operator: BoolOperator, queries: Vec<Filter>) -> Self {
        Self::Not { operator, queries }
    }

    pub fn multi(operator: BoolOperator, queries: Vec<Filter>) -> Self {
        Self::Multi { operator, queries }
    }
}

/// Sort clause.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sorting {
    pub field: String,
    pub order: SortDirection,
    #[serde(rename = "naturalSorting")]
    pub natural_sorting: bool,
}

impl Sorting {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortDirection::Ascending,
            natural_sorting: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortDirection::Descending,
            natural_sorting: false,
        }
    }

    #[must_use]
    pub fn natural(mut self) -> Self {
        self.natural_sorting = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "ASC")]
    Ascending,
    #[serde(rename = "DESC")]
    Descending,
}

/// Declarative query: paging, term, ids, filters, sorting, requested
/// associations and aggregations.
#[derive(Debug, Clone, Default)]
pub struct Criteria {
    page: Option<u64>,
    limit: Option<u64>,
    term: Option<String>,
    ids: Vec<String>,
    filters: Vec<Filter>,
    sortings: Vec<Sorting>,
    associations: BTreeMap<String, Criteria>,
    aggregations: Vec<Value>,
    total_count_mode: Option<TotalCountMode>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor with paging set.
    pub fn with_paging(page: u64, limit: u64) -> Self {
        let mut criteria = Self::new();
        criteria.set_page(page);
        criteria.set_limit(limit);
        criteria
    }

    pub fn page(&self) -> Option<u64> {
        self.page
    }

    pub fn set_page(&mut self, page: u64) -> &mut Self {
        self.page = Some(page);
        self
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn set_limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    pub fn term(&self) -> Option<&str> {
        self.term.as_deref()
    }

    pub fn set_term(&mut self, term: impl Into<String>) -> &mut Self {
        self.term = Some(term.into());
        self
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Constrains the search to an explicit id set.
    pub fn set_ids(&mut self, ids: Vec<String>) -> &mut Self {
        self.ids = ids;
        self
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn add_filter(&mut self, filter: Filter) -> &mut Self {
        self.filters.push(filter);
        self
    }

    pub fn sortings(&self) -> &[Sorting] {
        &self.sortings
    }

    pub fn add_sorting(&mut self, sorting: Sorting) -> &mut Self {
        self.sortings.push(sorting);
        self
    }

    pub fn aggregations(&self) -> &[Value] {
        &self.aggregations
    }

    /// Adds an aggregation in its raw wire shape.
    pub fn add_aggregation(&mut self, aggregation: Value) -> &mut Self {
        self.aggregations.push(aggregation);
        self
    }

    pub fn total_count_mode(&self) -> Option<TotalCountMode> {
        self.total_count_mode
    }

    pub fn set_total_count_mode(&mut self, mode: TotalCountMode) -> &mut Self {
        self.total_count_mode = Some(mode);
        self
    }

    /// Requests an association. Dotted paths (`categories.media`) create the
    /// nested criteria chain. Returns the innermost criteria for further
    /// refinement.
    pub fn association(&mut self, path: &str) -> &mut Criteria {
        match path.split_once('.') {
            Some((head, rest)) => self
                .associations
                .entry(head.to_string())
                .or_default()
                .association(rest),
            None => self.associations.entry(path.to_string()).or_default(),
        }
    }

    /// Requests an association, returning `self` for chaining.
    pub fn add_association(&mut self, path: &str) -> &mut Self {
        self.association(path);
        self
    }

    pub fn has_association(&self, field: &str) -> bool {
        self.associations.contains_key(field)
    }

    /// The criteria requested for a direct association, if any.
    pub fn get_association(&self, field: &str) -> Option<&Criteria> {
        self.associations.get(field)
    }

    pub fn associations(&self) -> &BTreeMap<String, Criteria> {
        &self.associations
    }

    /// Serializes to the plain object the search endpoints expect.
    pub fn to_payload(&self) -> Value {
        let mut payload = Map::new();

        if let Some(page) = self.page {
            payload.insert("page".to_string(), Value::from(page));
        }
        if let Some(limit) = self.limit {
            payload.insert("limit".to_string(), Value::from(limit));
        }
        if let Some(term) = &self.term {
            payload.insert("term".to_string(), Value::from(term.clone()));
        }
        if !self.ids.is_empty() {
            payload.insert(
                "ids".to_string(),
                Value::Array(self.ids.iter().cloned().map(Value::String).collect()),
            );
        }
        if !self.filters.is_empty() {
            // Filter/Sorting serialization is derive-driven and infallible.
            payload.insert(
                "filter".to_string(),
                serde_json::to_value(&self.filters).unwrap_or_default(),
            );
        }
        if !self.sortings.is_empty() {
            payload.insert(
                "sort".to_string(),
                serde_json::to_value(&self.sortings).unwrap_or_default(),
            );
        }
        if !self.associations.is_empty() {
            let associations = self
                .associations
                .iter()
                .map(|(name, criteria)| (name.clone(), criteria.to_payload()))
                .collect();
            payload.insert("associations".to_string(), Value::Object(associations));
        }
        if !self.aggregations.is_empty() {
            payload.insert(
                "aggregations".to_string(),
                Value::Array(self.aggregations.clone()),
            );
        }
        if let Some(mode) = self.total_count_mode {
            payload.insert(
                "total-count-mode".to_string(),
                Value::from(mode.as_number()),
            );
        }

        Value::Object(payload)
    }
}
