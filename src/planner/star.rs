//! Star planner: single-fact queries become one SELECT.
//!
//! FROM the base fact, one LEFT JOIN per resolved join step, aliased
//! dimension and measure projections, and the bare dimension expressions
//! repeated in GROUP BY.

use crate::model::SemanticModel;
use crate::semantic::graph::JoinGraph;
use crate::semantic::resolved::{substitute_components, ResolvedQuery};
use crate::sql::expr::ExprExt;
use crate::sql::query::Select;

/// A planned query ready for rendering.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub ast: Select,
}

/// Plans star-schema queries: a single fact base with dimension joins.
pub struct StarPlanner;

impl StarPlanner {
    pub fn new() -> Self {
        Self
    }

    pub fn plan(&self, resolved: &ResolvedQuery, model: &SemanticModel) -> QueryPlan {
        let graph = JoinGraph::new(model, &resolved.use_path_names);
        let mut select = Select::new();

        for dim in &resolved.dimensions {
            select = select.select(dim.expr.clone().alias(&dim.name));
        }

        for measure in &resolved.measures {
            let expr = if measure.is_metric() {
                substitute_components(&measure.expression, &resolved.metric_components)
            } else {
                measure.expression.clone()
            };
            select = select.select(expr.alias(&measure.name));
        }

        if let Some(base) = model.data_objects.get(&resolved.base_object) {
            select = select.from_table(&base.qualified_code(), &resolved.base_object);
        }

        for step in &resolved.join_steps {
            let Some(target) = model.data_objects.get(&step.to_object) else {
                continue;
            };
            let on = graph.build_on_condition(step);
            select = select.left_join(&target.qualified_code(), &step.to_object, on);
        }

        for filter in &resolved.where_filters {
            select = select.and_where(filter.expression.clone());
        }

        for dim in &resolved.dimensions {
            select = select.group_by(dim.expr.clone());
        }

        for filter in &resolved.having_filters {
            select = select.and_having(filter.expression.clone());
        }

        for (expr, desc) in &resolved.order_by {
            select = select.order_by(expr.clone(), *desc);
        }

        if let Some(limit) = resolved.limit {
            select = select.limit(limit);
        }

        QueryPlan { ast: select }
    }
}

impl Default for StarPlanner {
    fn default() -> Self {
        Self::new()
    }
}
