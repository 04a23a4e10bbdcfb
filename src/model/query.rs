//! Query request types: the structured analytical query surface.

use serde::Deserialize;

use crate::error::{ErrorCode, Issue};
use crate::model::types::TimeGrain;

/// Filter operators. Every alias in the wire format resolves to the same
/// variant, so alias sets produce byte-identical SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "equals", alias = "=", alias = "eq")]
    Equals,
    #[serde(rename = "notequals", alias = "!=", alias = "neq")]
    NotEquals,
    #[serde(rename = "gt", alias = ">")]
    Gt,
    #[serde(rename = "gte", alias = ">=")]
    Gte,
    #[serde(rename = "lt", alias = "<")]
    Lt,
    #[serde(rename = "lte", alias = "<=")]
    Lte,
    #[serde(rename = "inlist", alias = "in")]
    InList,
    #[serde(rename = "notinlist", alias = "not_in")]
    NotInList,
    #[serde(rename = "set", alias = "is_not_null")]
    Set,
    #[serde(rename = "notset", alias = "is_null")]
    NotSet,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "notcontains")]
    NotContains,
    #[serde(rename = "starts_with")]
    StartsWith,
    #[serde(rename = "ends_with")]
    EndsWith,
    #[serde(rename = "like")]
    Like,
    #[serde(rename = "notlike")]
    NotLike,
    #[serde(rename = "between")]
    Between,
    #[serde(rename = "notbetween")]
    NotBetween,
    #[serde(rename = "relative")]
    Relative,
}

/// Units accepted by relative-date filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelativeUnit {
    Day,
    Week,
    Month,
    Year,
}

impl RelativeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelativeUnit::Day => "day",
            RelativeUnit::Week => "week",
            RelativeUnit::Month => "month",
            RelativeUnit::Year => "year",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelativeDirection {
    #[default]
    Past,
    Future,
}

/// The value object for `relative` filters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RelativeSpec {
    pub unit: RelativeUnit,
    pub count: i64,
    #[serde(default)]
    pub direction: RelativeDirection,
    #[serde(default = "default_true", alias = "includeCurrent")]
    pub include_current: bool,
}

fn default_true() -> bool {
    true
}

/// A filter value: scalar, list, or relative-time object.
///
/// `between` expects a two-element list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<FilterValue>),
    Relative(RelativeSpec),
}

/// A filter condition in a query.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryFilter {
    pub field: String,
    pub op: FilterOperator,
    #[serde(default)]
    pub value: Option<FilterValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Order-by clause in a query.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryOrderBy {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

/// The SELECT part of a query: dimension names + measure/metric names.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct QuerySelect {
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub measures: Vec<String>,
}

/// Selects a named secondary join path for a specific (source, target) pair.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UsePathName {
    pub source: String,
    pub target: String,
    #[serde(rename = "pathName", alias = "path_name")]
    pub path_name: String,
}

/// A complete analytical query.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryObject {
    pub select: QuerySelect,
    #[serde(rename = "where", default)]
    pub where_filters: Vec<QueryFilter>,
    #[serde(default)]
    pub having: Vec<QueryFilter>,
    #[serde(default)]
    pub order_by: Vec<QueryOrderBy>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(rename = "usePathNames", alias = "use_path_names", default)]
    pub use_path_names: Vec<UsePathName>,
}

/// A dimension reference from a query's select list, optionally carrying a
/// `:grain` suffix (e.g. `Order Date:month`).
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionRef {
    pub name: String,
    pub grain: Option<TimeGrain>,
}

impl DimensionRef {
    /// Parse `name` or `name:grain` notation.
    pub fn parse(raw: &str) -> Result<Self, Issue> {
        match raw.rsplit_once(':') {
            Some((name, suffix)) => match suffix.parse::<TimeGrain>() {
                Ok(grain) => Ok(Self {
                    name: name.to_string(),
                    grain: Some(grain),
                }),
                Err(()) => Err(Issue::new(
                    ErrorCode::InvalidGrain,
                    format!("Invalid time grain '{}' in dimension reference '{}'", suffix, raw),
                )
                .with_path("select.dimensions")),
            },
            None => Ok(Self {
                name: raw.to_string(),
                grain: None,
            }),
        }
    }
}
