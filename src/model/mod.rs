//! Typed in-memory representation of the parsed semantic model YAML.
//!
//! The model is constructed once from YAML (plus a source-position map for
//! error reporting), validated, and then treated as immutable input to the
//! compiler. Nothing in the core mutates a model.

pub mod data_object;
pub mod dimension;
pub mod loader;
pub mod measure;
pub mod metric;
pub mod query;
pub mod types;

use std::collections::BTreeMap;

use serde::Deserialize;

pub use data_object::{Column, DataObject, JoinDef};
pub use dimension::Dimension;
pub use loader::{LoadedModel, SourceMap};
pub use measure::{ColumnTarget, FilterLiteral, Measure, MeasureFilter, WithinGroup};
pub use metric::Metric;
pub use query::{
    DimensionRef, FilterOperator, FilterValue, QueryFilter, QueryObject, QueryOrderBy,
    QuerySelect, RelativeDirection, RelativeSpec, RelativeUnit, SortDirection, UsePathName,
};
pub use types::{AggregationType, Cardinality, DataType, TimeGrain};

fn default_version() -> f64 {
    1.0
}

/// Complete semantic model parsed from the model YAML.
///
/// Maps are keyed by display name; those keys are the names referenced by
/// queries, joins, and expressions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SemanticModel {
    #[serde(default = "default_version")]
    pub version: f64,
    #[serde(rename = "dataObjects", default)]
    pub data_objects: BTreeMap<String, DataObject>,
    #[serde(default)]
    pub dimensions: BTreeMap<String, Dimension>,
    #[serde(default)]
    pub measures: BTreeMap<String, Measure>,
    #[serde(default)]
    pub metrics: BTreeMap<String, Metric>,
}

impl SemanticModel {
    /// Resolve a `(dataObject, column)` pair to the column's physical code.
    ///
    /// Falls back to the display name when either side is unknown; the
    /// validator reports such misses with full context.
    pub fn column_code(&self, object: &str, column: &str) -> String {
        self.data_objects
            .get(object)
            .map(|obj| obj.column_code(column))
            .unwrap_or_else(|| column.to_string())
    }
}
