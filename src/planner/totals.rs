//! Grand-total wrapper for `total: true` measures.
//!
//! Per-group aggregates become grand totals via `AGG(x) OVER ()`. Window
//! functions cannot coexist with GROUP BY on pre-grouped rows, so the
//! planner output is moved into a `base` CTE and the window re-aggregation
//! happens in an outer query.
//!
//! Re-aggregation per original kind: SUM/COUNT/COUNT_DISTINCT re-sum the
//! per-group values (COUNT_DISTINCT totals may overcount across groups),
//! MIN/MAX take the min/max of group extremes, AVG is exact via
//! `SUM(sum) OVER () / SUM(count) OVER ()` helper columns.

use crate::error::{CompileError, CompileResult};
use crate::semantic::resolved::{ResolvedMeasure, ResolvedQuery};
use crate::sql::expr::{col, Expr, ExprExt};
use crate::sql::query::{Cte, CteBody, FromClause, OrderByItem, Select, TableSource};
use crate::model::types::AggregationType;

const BASE_CTE_NAME: &str = "base";

/// Wrap a star plan with the totals CTE when any selected measure (or
/// metric component) carries the total flag. Plans without totals pass
/// through untouched.
pub fn wrap_with_totals(ast: Select, resolved: &ResolvedQuery) -> CompileResult<Select> {
    if !resolved.has_totals() {
        return Ok(ast);
    }

    // Metrics that reference at least one total component get decomposed in
    // the base CTE and rebuilt in the outer query.
    let decompose: Vec<&ResolvedMeasure> = resolved
        .measures
        .iter()
        .filter(|m| {
            m.component_measures.iter().any(|name| {
                resolved
                    .metric_components
                    .get(name)
                    .map(|c| c.total)
                    .unwrap_or(false)
            })
        })
        .collect();
    let decompose_names: Vec<&str> = decompose.iter().map(|m| m.name.as_str()).collect();
    let direct_names: Vec<&str> = resolved
        .measures
        .iter()
        .filter(|m| !m.is_metric())
        .map(|m| m.name.as_str())
        .collect();

    for measure in resolved
        .measures
        .iter()
        .filter(|m| m.total)
        .chain(resolved.metric_components.values().filter(|c| c.total))
    {
        reagg_function(measure)?;
    }

    // Base CTE columns: metric columns with total components expand into
    // their component columns; AVG totals expand into sum/count helpers.
    let mut base_columns: Vec<Expr> = Vec::new();
    for projection in &ast.projections {
        let alias = projection_alias(projection);

        if let Some(name) = alias {
            if decompose_names.contains(&name) {
                let metric = resolved
                    .measures
                    .iter()
                    .find(|m| m.name == name)
                    .expect("decomposed metric is selected");
                for component_name in &metric.component_measures {
                    if direct_names.contains(&component_name.as_str()) {
                        continue;
                    }
                    let Some(component) = resolved.metric_components.get(component_name) else {
                        continue;
                    };
                    if is_avg_total(component) {
                        base_columns.push(avg_helper(component, AvgHelper::Sum));
                        base_columns.push(avg_helper(component, AvgHelper::Count));
                    } else {
                        base_columns
                            .push(component.expression.clone().alias(&component.name));
                    }
                }
                continue;
            }

            if let Some(measure) = resolved
                .measures
                .iter()
                .find(|m| m.name == name && !m.is_metric())
            {
                if is_avg_total(measure) {
                    base_columns.push(avg_helper(measure, AvgHelper::Sum));
                    base_columns.push(avg_helper(measure, AvgHelper::Count));
                    continue;
                }
            }
        }

        base_columns.push(projection.clone());
    }

    let base_query = Select {
        ctes: vec![],
        projections: base_columns,
        from: ast.from.clone(),
        joins: ast.joins.clone(),
        where_clause: ast.where_clause.clone(),
        group_by: ast.group_by.clone(),
        having: ast.having.clone(),
        order_by: vec![],
        limit: None,
    };

    // Outer query: dimensions pass through, totals re-aggregate over the
    // whole result, everything else passes through by alias.
    let mut outer_columns: Vec<Expr> = Vec::new();
    for dim in &resolved.dimensions {
        outer_columns.push(col(&dim.name).alias(&dim.name));
    }
    for measure in &resolved.measures {
        if measure.is_metric() {
            if decompose_names.contains(&measure.name.as_str()) {
                let rebuilt = substitute_total_refs(&measure.expression, resolved)?;
                outer_columns.push(rebuilt.alias(&measure.name));
            } else {
                outer_columns.push(col(&measure.name).alias(&measure.name));
            }
        } else if measure.total {
            outer_columns.push(total_window(measure)?.alias(&measure.name));
        } else {
            outer_columns.push(col(&measure.name).alias(&measure.name));
        }
    }

    let outer_order_by: Vec<OrderByItem> = ast
        .order_by
        .iter()
        .map(|item| OrderByItem {
            expr: strip_qualifier(&item.expr),
            desc: item.desc,
        })
        .collect();

    let mut ctes = ast.ctes.clone();
    ctes.push(Cte {
        name: BASE_CTE_NAME.into(),
        body: CteBody::Select(Box::new(base_query)),
    });

    Ok(Select {
        ctes,
        projections: outer_columns,
        from: Some(FromClause {
            source: TableSource::Table(BASE_CTE_NAME.into()),
            alias: Some(BASE_CTE_NAME.into()),
        }),
        joins: vec![],
        where_clause: None,
        group_by: vec![],
        having: None,
        order_by: outer_order_by,
        limit: ast.limit,
    })
}

fn projection_alias(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Aliased { alias, .. } => Some(alias.as_str()),
        _ => None,
    }
}

fn is_avg_total(measure: &ResolvedMeasure) -> bool {
    measure.total && measure.aggregation == Some(AggregationType::Avg)
}

fn avg_sum_alias(name: &str) -> String {
    format!("{}__sum", name)
}

fn avg_count_alias(name: &str) -> String {
    format!("{}__count", name)
}

enum AvgHelper {
    Sum,
    Count,
}

/// A SUM or COUNT helper column over an AVG total's inner expression.
fn avg_helper(measure: &ResolvedMeasure, kind: AvgHelper) -> Expr {
    let inner = match &measure.expression {
        Expr::Function { args, .. } if !args.is_empty() => args[0].clone(),
        other => other.clone(),
    };
    match kind {
        AvgHelper::Sum => Expr::Function {
            name: "SUM".into(),
            args: vec![inner],
            distinct: false,
            within_group: vec![],
        }
        .alias(&avg_sum_alias(&measure.name)),
        AvgHelper::Count => Expr::Function {
            name: "COUNT".into(),
            args: vec![inner],
            distinct: false,
            within_group: vec![],
        }
        .alias(&avg_count_alias(&measure.name)),
    }
}

/// The outer window function re-aggregating a total measure's column.
fn total_window(measure: &ResolvedMeasure) -> CompileResult<Expr> {
    if is_avg_total(measure) {
        let sum_window = Expr::Window {
            name: "SUM".into(),
            args: vec![col(&avg_sum_alias(&measure.name))],
            partition_by: vec![],
            order_by: vec![],
        };
        let count_window = Expr::Window {
            name: "SUM".into(),
            args: vec![col(&avg_count_alias(&measure.name))],
            partition_by: vec![],
            order_by: vec![],
        };
        return Ok(sum_window.binop(crate::sql::BinaryOperator::Div, count_window));
    }

    Ok(Expr::Window {
        name: reagg_function(measure)?.into(),
        args: vec![col(&measure.name)],
        partition_by: vec![],
        order_by: vec![],
    })
}

/// The outer window function name for a total measure's aggregation kind.
fn reagg_function(measure: &ResolvedMeasure) -> CompileResult<&'static str> {
    match measure.aggregation.unwrap_or(AggregationType::Sum) {
        AggregationType::Sum
        | AggregationType::Count
        | AggregationType::CountDistinct
        | AggregationType::Avg => Ok("SUM"),
        AggregationType::Min => Ok("MIN"),
        AggregationType::Max => Ok("MAX"),
        unsupported => Err(CompileError::UnsupportedFeature(format!(
            "measure '{}': {} cannot be re-aggregated for total: true",
            measure.name, unsupported
        ))),
    }
}

/// Rebuild a metric over the base CTE: total components become window
/// functions, non-total components pass through by alias.
fn substitute_total_refs(expr: &Expr, resolved: &ResolvedQuery) -> CompileResult<Expr> {
    Ok(match expr {
        Expr::Column {
            table: None,
            column,
        } => match resolved.metric_components.get(column) {
            Some(component) if component.is_metric() => {
                substitute_total_refs(&component.expression, resolved)?
            }
            Some(component) if component.total => total_window(component)?,
            Some(component) => col(&component.name),
            None => expr.clone(),
        },
        Expr::BinaryOp { left, op, right } => Expr::BinaryOp {
            left: Box::new(substitute_total_refs(left, resolved)?),
            op: *op,
            right: Box::new(substitute_total_refs(right, resolved)?),
        },
        Expr::UnaryOp { op, expr: inner } => Expr::UnaryOp {
            op: *op,
            expr: Box::new(substitute_total_refs(inner, resolved)?),
        },
        Expr::Paren(inner) => Expr::Paren(Box::new(substitute_total_refs(inner, resolved)?)),
        other => other.clone(),
    })
}

/// Outer ORDER BY references must be alias-only.
fn strip_qualifier(expr: &Expr) -> Expr {
    match expr {
        Expr::Column {
            table: Some(_),
            column,
        } => col(column),
        other => other.clone(),
    }
}
