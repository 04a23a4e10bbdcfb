//! Metrics: expressions over measures, expanded at query time.

use serde::Deserialize;

/// A composite metric combining measures via an expression.
///
/// The expression references measures (or other metrics) by name using
/// `{[Name]}` placeholders. References must be acyclic.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Metric {
    pub label: String,
    pub expression: String,
    #[serde(default)]
    pub format: Option<String>,
}
