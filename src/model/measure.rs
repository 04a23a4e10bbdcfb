//! Measures: named aggregations over data object columns.

use serde::Deserialize;

use crate::model::query::FilterOperator;
use crate::model::types::{AggregationType, DataType};

/// Reference to a data object column by (dataObject, column) pair.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColumnTarget {
    #[serde(rename = "dataObject")]
    pub data_object: String,
    pub column: String,
}

/// A typed scalar used in measure filter definitions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FilterLiteral {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// A filter baked into a measure definition.
///
/// Applied as a CASE guard inside the aggregation:
/// `SUM(CASE WHEN cond THEN expr END)`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MeasureFilter {
    #[serde(default)]
    pub column: Option<ColumnTarget>,
    pub operator: FilterOperator,
    #[serde(default)]
    pub values: Vec<FilterLiteral>,
}

/// WITHIN GROUP ordering clause for LISTAGG measures.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WithinGroup {
    pub column: ColumnTarget,
    #[serde(default = "default_order")]
    pub order: String,
}

fn default_order() -> String {
    "ASC".to_string()
}

/// An aggregation measure: either a single column reference or an expression
/// over `{[DataObject].[Column]}` placeholders.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Measure {
    pub label: String,
    #[serde(default)]
    pub column: Option<ColumnTarget>,
    #[serde(rename = "resultType")]
    pub result_type: DataType,
    pub aggregation: AggregationType,
    #[serde(default)]
    pub expression: Option<String>,
    #[serde(default)]
    pub distinct: bool,
    /// Grand-total measure: re-aggregated over the whole result via a
    /// window function wrapper.
    #[serde(default)]
    pub total: bool,
    #[serde(default)]
    pub filter: Option<MeasureFilter>,
    #[serde(default)]
    pub format: Option<String>,
    /// Permits join paths that multiply this measure's rows.
    #[serde(rename = "allowFanOut", default)]
    pub allow_fan_out: bool,
    /// LISTAGG separator, defaults to `,` when omitted.
    #[serde(default)]
    pub delimiter: Option<String>,
    #[serde(rename = "withinGroup", default)]
    pub within_group: Option<WithinGroup>,
}
