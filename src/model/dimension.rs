//! Dimensions: groupable attributes mapping to a single data object column.

use serde::Deserialize;

use crate::model::types::{DataType, TimeGrain};

/// A named dimension referencing a data object column.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Dimension {
    pub label: String,
    #[serde(rename = "dataObject")]
    pub data_object: String,
    #[serde(default)]
    pub column: String,
    #[serde(rename = "resultType")]
    pub result_type: DataType,
    /// Default truncation grain; a query-level `:grain` suffix overrides it.
    #[serde(rename = "timeGrain", default)]
    pub time_grain: Option<TimeGrain>,
    /// Display format hint, carried through untouched.
    #[serde(default)]
    pub format: Option<String>,
}
