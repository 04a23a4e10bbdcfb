//! Composite Fact Layer planner: multi-fact queries.
//!
//! Strategy: a single CTE named `composite_01` whose body is a UNION ALL of
//! one SELECT per contributing fact. Each leg projects the conformed
//! dimensions plus its own pre-aggregation measure columns; sibling
//! measures are padded with NULLs of matching names. The outer SELECT
//! re-aggregates over the CTE and groups by the conformed dimensions.
//!
//! On dialects with `union_by_name` (Snowflake) the legs omit the NULL
//! padding and the union matches columns by name.

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::{CompileError, CompileResult};
use crate::model::SemanticModel;
use crate::semantic::graph::JoinGraph;
use crate::semantic::resolved::{
    outer_aggregate, substitute_outer_components, ResolvedMeasure, ResolvedQuery,
};
use crate::sql::dialect::{Dialect, SqlDialect};
use crate::sql::expr::{col, lit_null, Expr, ExprExt};
use crate::sql::query::{Cte, CteBody, Select, UnionAll};

use super::star::{QueryPlan, StarPlanner};

const CFL_CTE_NAME: &str = "composite_01";

/// A concrete leg measure: output name, resolved form, home fact, and any
/// extra objects its expression draws from.
struct LegMeasure {
    name: String,
    measure: ResolvedMeasure,
    home: String,
    extra_objects: BTreeSet<String>,
}

/// Plans Composite Fact Layer queries: conformed dimensions + fact
/// stitching via UNION ALL.
pub struct CflPlanner;

impl CflPlanner {
    pub fn new() -> Self {
        Self
    }

    pub fn plan(
        &self,
        resolved: &ResolvedQuery,
        model: &SemanticModel,
        dialect: Dialect,
    ) -> CompileResult<QueryPlan> {
        if resolved.has_totals() {
            return Err(CompileError::UnsupportedFeature(
                "total measures cannot be combined with a multi-fact (composite) query".into(),
            ));
        }

        let leg_measures = self.flatten_measures(resolved, model);
        let facts: BTreeSet<&str> = leg_measures.iter().map(|m| m.home.as_str()).collect();

        if facts.len() <= 1 {
            // A metric's measures all share one fact: plain star plan.
            return Ok(StarPlanner::new().plan(resolved, model));
        }

        let by_name = dialect.capabilities().union_by_name;
        let graph = JoinGraph::new(model, &resolved.use_path_names);
        debug!(facts = facts.len(), by_name, "planning composite fact layer");

        let mut legs: Vec<Select> = Vec::new();
        for &fact in &facts {
            legs.push(self.build_leg(fact, &leg_measures, resolved, model, &graph, by_name)?);
        }

        let mut outer = Select::new().with_cte(Cte {
            name: CFL_CTE_NAME.into(),
            body: CteBody::Union(UnionAll {
                selects: legs,
                by_name,
            }),
        });

        for dim in &resolved.dimensions {
            outer = outer.select(col(&dim.name).alias(&dim.name));
        }
        for leg_measure in &leg_measures {
            outer = outer.select(outer_aggregate(&leg_measure.measure).alias(&leg_measure.name));
        }
        for measure in &resolved.measures {
            if measure.is_metric() {
                let expr =
                    substitute_outer_components(&measure.expression, &resolved.metric_components);
                outer = outer.select(expr.alias(&measure.name));
            }
        }

        outer = outer.from_table(CFL_CTE_NAME, CFL_CTE_NAME);

        for dim in &resolved.dimensions {
            outer = outer.group_by(col(&dim.name));
        }
        for filter in &resolved.having_filters {
            outer = outer.and_having(filter.expression.clone());
        }
        for (expr, desc) in &resolved.order_by {
            outer = outer.order_by(expr.clone(), *desc);
        }
        if let Some(limit) = resolved.limit {
            outer = outer.limit(limit);
        }

        Ok(QueryPlan { ast: outer })
    }

    /// Expand selected measures (and metric components, recursively) into
    /// the ordered list of leg columns, each assigned to its home fact.
    fn flatten_measures(&self, resolved: &ResolvedQuery, model: &SemanticModel) -> Vec<LegMeasure> {
        let mut flattened: Vec<LegMeasure> = Vec::new();
        let mut seen: BTreeSet<String> = BTreeSet::new();

        fn push_components(
            names: &[String],
            resolved: &ResolvedQuery,
            model: &SemanticModel,
            seen: &mut BTreeSet<String>,
            out: &mut Vec<LegMeasure>,
        ) {
            for name in names {
                let Some(component) = resolved.metric_components.get(name) else {
                    continue;
                };
                if component.is_metric() {
                    push_components(&component.component_measures, resolved, model, seen, out);
                    continue;
                }
                if !seen.insert(name.clone()) {
                    continue;
                }
                let (home, extra) = measure_home(name, resolved, model);
                out.push(LegMeasure {
                    name: name.clone(),
                    measure: component.clone(),
                    home,
                    extra_objects: extra,
                });
            }
        }

        for measure in &resolved.measures {
            if measure.is_metric() {
                push_components(
                    &measure.component_measures,
                    resolved,
                    model,
                    &mut seen,
                    &mut flattened,
                );
            } else {
                if !seen.insert(measure.name.clone()) {
                    continue;
                }
                let (home, extra) = measure_home(&measure.name, resolved, model);
                flattened.push(LegMeasure {
                    name: measure.name.clone(),
                    measure: measure.clone(),
                    home,
                    extra_objects: extra,
                });
            }
        }

        flattened
    }

    /// One UNION leg: conformed dimensions, this fact's pre-aggregation
    /// measure columns, NULL padding for the others.
    fn build_leg(
        &self,
        fact: &str,
        leg_measures: &[LegMeasure],
        resolved: &ResolvedQuery,
        model: &SemanticModel,
        graph: &JoinGraph<'_>,
        by_name: bool,
    ) -> CompileResult<Select> {
        let mut leg = Select::new();

        for dim in &resolved.dimensions {
            leg = leg.select(dim.expr.clone().alias(&dim.name));
        }

        for leg_measure in leg_measures {
            if leg_measure.home == fact {
                let pre_agg = unwrap_aggregation(&leg_measure.measure);
                leg = leg.select(pre_agg.alias(&leg_measure.name));
            } else if !by_name {
                leg = leg.select(lit_null().alias(&leg_measure.name));
            }
        }

        if let Some(obj) = model.data_objects.get(fact) {
            leg = leg.from_table(&obj.qualified_code(), fact);
        }

        // This leg joins whatever its dimensions, filters, and own measure
        // expressions reach for.
        let mut targets: BTreeSet<String> = resolved
            .dimensions
            .iter()
            .map(|d| d.object_name.clone())
            .collect();
        for filter in &resolved.where_filters {
            if let Some(object) = &filter.object_name {
                targets.insert(object.clone());
            }
        }
        for leg_measure in leg_measures {
            if leg_measure.home == fact {
                targets.extend(leg_measure.extra_objects.iter().cloned());
            }
        }
        targets.insert(fact.to_string());

        let base: BTreeSet<String> = [fact.to_string()].into();
        let steps = graph.find_join_path(&base, &targets)?;
        for step in &steps {
            let Some(target) = model.data_objects.get(&step.to_object) else {
                continue;
            };
            let on = graph.build_on_condition(step);
            leg = leg.left_join(&target.qualified_code(), &step.to_object, on);
        }

        // Dimension predicates filter fact rows inside each leg, where the
        // base-table references are in scope.
        for filter in &resolved.where_filters {
            leg = leg.and_where(filter.expression.clone());
        }

        Ok(leg)
    }
}

impl Default for CflPlanner {
    fn default() -> Self {
        Self::new()
    }
}

/// The fact a measure belongs to, plus any further objects its expression
/// references (joined into the same leg).
fn measure_home(
    name: &str,
    resolved: &ResolvedQuery,
    model: &SemanticModel,
) -> (String, BTreeSet<String>) {
    let mut objects: BTreeSet<String> = BTreeSet::new();
    if let Some(measure) = model.measures.get(name) {
        if let Some(target) = &measure.column {
            objects.insert(target.data_object.clone());
        }
        if let Some(formula) = &measure.expression {
            for (object, _) in crate::semantic::expr_parser::column_placeholders(formula) {
                objects.insert(object);
            }
        }
    }

    let mut iter = objects.into_iter();
    let home = iter.next().unwrap_or_else(|| resolved.base_object.clone());
    (home, iter.collect())
}

/// Extract the pre-aggregation expression from an aggregate call.
fn unwrap_aggregation(measure: &ResolvedMeasure) -> Expr {
    match &measure.expression {
        Expr::Function { args, .. } if !args.is_empty() => args[0].clone(),
        other => other.clone(),
    }
}
