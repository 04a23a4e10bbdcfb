//! Resolved types - output of the resolution phase.
//!
//! After resolution every reference has been validated and mapped to an AST
//! fragment; the planners only assemble these, they never look names up.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::types::{AggregationType, TimeGrain};
use crate::model::UsePathName;
use crate::semantic::graph::JoinStep;
use crate::sql::expr::Expr;

/// A resolved dimension with its grain-applied column expression.
#[derive(Debug, Clone)]
pub struct ResolvedDimension {
    /// Display name, used as the projection alias.
    pub name: String,
    /// Home data object.
    pub object_name: String,
    /// Column display name.
    pub column_name: String,
    /// Physical column code.
    pub source_column: String,
    /// Effective grain (query override or dimension default).
    pub grain: Option<TimeGrain>,
    /// The dialect-rendered expression: a qualified column reference,
    /// wrapped in the dialect's time truncation when a grain applies.
    pub expr: Expr,
}

/// A resolved measure (or metric) with its aggregate expression.
#[derive(Debug, Clone)]
pub struct ResolvedMeasure {
    pub name: String,
    /// The aggregation kind; `None` for metrics, whose aggregation lives in
    /// their component measures.
    pub aggregation: Option<AggregationType>,
    /// Star-form expression: the full aggregate call for measures, the
    /// formula tree with bare component markers for metrics.
    pub expression: Expr,
    /// True when built from an expression template rather than a single
    /// column reference.
    pub is_expression: bool,
    /// Component measure names, non-empty only for metrics.
    pub component_measures: Vec<String>,
    /// DISTINCT flag on the rendered aggregate.
    pub distinct: bool,
    /// Grand-total measure (window re-aggregation wrapper applies).
    pub total: bool,
}

impl ResolvedMeasure {
    pub fn is_metric(&self) -> bool {
        !self.component_measures.is_empty()
    }
}

/// A resolved filter predicate.
#[derive(Debug, Clone)]
pub struct ResolvedFilter {
    pub expression: Expr,
    /// HAVING-classified (field resolved to a measure or metric).
    pub is_aggregate: bool,
    /// Home data object of the filtered field, when it has one.
    pub object_name: Option<String>,
}

/// Result of query resolution - ready for SQL planning.
#[derive(Debug, Clone, Default)]
pub struct ResolvedQuery {
    pub dimensions: Vec<ResolvedDimension>,
    pub measures: Vec<ResolvedMeasure>,
    /// The selected base fact object.
    pub base_object: String,
    /// Every data object the query touches.
    pub required_objects: BTreeSet<String>,
    /// Ordered join steps from the base object.
    pub join_steps: Vec<JoinStep>,
    pub where_filters: Vec<ResolvedFilter>,
    pub having_filters: Vec<ResolvedFilter>,
    /// (expression, descending) pairs.
    pub order_by: Vec<(Expr, bool)>,
    pub limit: Option<u64>,
    /// Effective secondary-join selections.
    pub use_path_names: Vec<UsePathName>,
    /// Set when measures resolve to more than one fact.
    pub requires_cfl: bool,
    /// Facts contributing measures.
    pub measure_source_objects: BTreeSet<String>,
    /// Resolved component measures of selected metrics, by name.
    pub metric_components: BTreeMap<String, ResolvedMeasure>,
}

/// Replace bare component markers in a metric tree with the components'
/// star-form aggregate expressions. Nested metric components substitute
/// recursively; reference cycles are rejected by the validator.
pub fn substitute_components(expr: &Expr, components: &BTreeMap<String, ResolvedMeasure>) -> Expr {
    match expr {
        Expr::Column {
            table: None,
            column,
        } => match components.get(column) {
            Some(component) if component.is_metric() => {
                substitute_components(&component.expression, components)
            }
            Some(component) => component.expression.clone(),
            None => expr.clone(),
        },
        Expr::BinaryOp { left, op, right } => Expr::BinaryOp {
            left: Box::new(substitute_components(left, components)),
            op: *op,
            right: Box::new(substitute_components(right, components)),
        },
        Expr::UnaryOp { op, expr: inner } => Expr::UnaryOp {
            op: *op,
            expr: Box::new(substitute_components(inner, components)),
        },
        Expr::Paren(inner) => Expr::Paren(Box::new(substitute_components(inner, components))),
        other => other.clone(),
    }
}

/// Replace bare component markers with the outer-aggregation form used above
/// a composite CTE: `AGG("component name")` re-aggregating the leg column.
pub fn substitute_outer_components(
    expr: &Expr,
    components: &BTreeMap<String, ResolvedMeasure>,
) -> Expr {
    match expr {
        Expr::Column {
            table: None,
            column,
        } => match components.get(column) {
            Some(component) if component.is_metric() => {
                substitute_outer_components(&component.expression, components)
            }
            Some(component) => outer_aggregate(component),
            None => expr.clone(),
        },
        Expr::BinaryOp { left, op, right } => Expr::BinaryOp {
            left: Box::new(substitute_outer_components(left, components)),
            op: *op,
            right: Box::new(substitute_outer_components(right, components)),
        },
        Expr::UnaryOp { op, expr: inner } => Expr::UnaryOp {
            op: *op,
            expr: Box::new(substitute_outer_components(inner, components)),
        },
        Expr::Paren(inner) => {
            Expr::Paren(Box::new(substitute_outer_components(inner, components)))
        }
        other => other.clone(),
    }
}

/// The outer re-aggregation of a measure over its composite-CTE column.
pub fn outer_aggregate(measure: &ResolvedMeasure) -> Expr {
    let (name, implied_distinct) = measure
        .aggregation
        .unwrap_or(AggregationType::Sum)
        .sql_function();
    Expr::Function {
        name: name.to_string(),
        args: vec![Expr::Column {
            table: None,
            column: measure.name.clone(),
        }],
        distinct: measure.distinct || implied_distinct,
        within_group: vec![],
    }
}

impl ResolvedQuery {
    /// The fact tables this query reads, sorted.
    pub fn fact_tables(&self) -> Vec<String> {
        if self.measure_source_objects.is_empty() {
            if self.base_object.is_empty() {
                vec![]
            } else {
                vec![self.base_object.clone()]
            }
        } else {
            self.measure_source_objects.iter().cloned().collect()
        }
    }

    /// Does any selected measure (directly or via a metric component) carry
    /// the total flag?
    pub fn has_totals(&self) -> bool {
        self.measures.iter().any(|m| {
            m.total
                || m.component_measures.iter().any(|name| {
                    self.metric_components
                        .get(name)
                        .map(|c| c.total)
                        .unwrap_or(false)
                })
        })
    }
}
