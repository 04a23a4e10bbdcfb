//! Phase 1: query resolution.
//!
//! Transforms a query request into a fully resolved plan input: concrete
//! column references, aggregate expressions, a base fact, ordered join
//! steps, classified filters, and the CFL flag. The resolver holds the
//! target dialect so grain truncation, string matching, and relative-date
//! expansion are rendered here, never in the planners.

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::{CompileError, CompileResult, ErrorCode, Issue};
use crate::model::measure::{FilterLiteral, Measure, MeasureFilter};
use crate::model::query::{
    DimensionRef, FilterOperator, FilterValue, QueryFilter, QueryObject, RelativeDirection,
    RelativeSpec, RelativeUnit, SortDirection,
};
use crate::model::types::AggregationType;
use crate::model::SemanticModel;
use crate::semantic::expr_parser::{self, ExprParseError};
use crate::semantic::graph::JoinGraph;
use crate::semantic::resolved::{
    outer_aggregate, substitute_outer_components, ResolvedDimension, ResolvedFilter,
    ResolvedMeasure, ResolvedQuery,
};
use crate::sql::dialect::{Dialect, SqlDialect};
use crate::sql::expr::{col, lit_bool, lit_float, lit_int, lit_str, raw_sql, table_col, Expr, ExprExt};
use crate::sql::query::OrderByItem;

/// Resolves a `QueryObject` against a validated `SemanticModel`.
pub struct QueryResolver<'a> {
    model: &'a SemanticModel,
    dialect: Dialect,
}

impl<'a> QueryResolver<'a> {
    pub fn new(model: &'a SemanticModel, dialect: Dialect) -> Self {
        Self { model, dialect }
    }

    pub fn resolve(&self, query: &QueryObject) -> CompileResult<ResolvedQuery> {
        let mut issues: Vec<Issue> = Vec::new();
        let mut result = ResolvedQuery {
            limit: query.limit,
            use_path_names: query.use_path_names.clone(),
            ..Default::default()
        };

        // 1+2. Split select into dimensions and measures; resolve dimensions.
        for raw in &query.select.dimensions {
            match DimensionRef::parse(raw) {
                Err(issue) => issues.push(issue),
                Ok(dim_ref) => {
                    if let Some(resolved) = self.resolve_dimension(&dim_ref, &mut issues) {
                        result.required_objects.insert(resolved.object_name.clone());
                        result.dimensions.push(resolved);
                    }
                }
            }
        }

        // 3. Resolve measures and metrics, tracking source facts.
        for name in &query.select.measures {
            if let Some(resolved) = self.resolve_measure_or_metric(name, &mut result, &mut issues)? {
                let mut visited = BTreeSet::new();
                let sources = self.measure_source_objects(name, &mut visited);
                result.measure_source_objects.extend(sources.iter().cloned());
                result.required_objects.extend(sources);
                result.measures.push(resolved);
            }
        }

        // 4+5. Base fact selection and the CFL decision.
        result.base_object = self.select_base_object(&result);
        if !result.base_object.is_empty() {
            result.required_objects.insert(result.base_object.clone());
        }
        result.requires_cfl = result.measure_source_objects.len() > 1;

        // Validate path-name overrides before the graph consumes them.
        self.check_use_path_names(query, &mut issues);

        // 8. Classify filters by what the field resolves to, regardless of
        // which request list carried them.
        for filter in query.where_filters.iter().chain(query.having.iter()) {
            self.resolve_filter(filter, &mut result, &mut issues);
        }

        // 6. Join steps from the base to every required object.
        let graph = JoinGraph::new(self.model, &result.use_path_names);
        if !result.base_object.is_empty() && result.required_objects.len() > 1 {
            let base: BTreeSet<String> = [result.base_object.clone()].into();
            result.join_steps = graph.find_join_path(&base, &result.required_objects)?;
        }

        // 9. ORDER BY resolves to projection aliases.
        for order in &query.order_by {
            let selected = result.dimensions.iter().any(|d| d.name == order.field)
                || result.measures.iter().any(|m| m.name == order.field);
            if selected {
                result
                    .order_by
                    .push((col(&order.field), order.direction == SortDirection::Desc));
            } else {
                issues.push(
                    Issue::new(
                        ErrorCode::UnknownField,
                        format!("order_by references unselected field '{}'", order.field),
                    )
                    .with_path("order_by"),
                );
            }
        }

        if !issues.is_empty() {
            return Err(CompileError::Resolution(issues));
        }

        debug!(
            base = %result.base_object,
            facts = result.measure_source_objects.len(),
            joins = result.join_steps.len(),
            cfl = result.requires_cfl,
            "query resolved"
        );
        Ok(result)
    }

    fn resolve_dimension(
        &self,
        dim_ref: &DimensionRef,
        issues: &mut Vec<Issue>,
    ) -> Option<ResolvedDimension> {
        let Some(dim) = self.model.dimensions.get(&dim_ref.name) else {
            issues.push(
                Issue::new(
                    ErrorCode::UnknownDimension,
                    format!("Unknown dimension '{}'", dim_ref.name),
                )
                .with_path("select.dimensions")
                .with_related(dim_ref.name.clone()),
            );
            return None;
        };

        if !self.model.data_objects.contains_key(&dim.data_object) {
            issues.push(
                Issue::new(
                    ErrorCode::UnknownDataObject,
                    format!(
                        "Dimension '{}' references unknown data object '{}'",
                        dim_ref.name, dim.data_object
                    ),
                )
                .with_path(format!("dimensions.{}", dim_ref.name)),
            );
            return None;
        }

        let source_column = self.model.column_code(&dim.data_object, &dim.column);
        let grain = dim_ref.grain.or(dim.time_grain);

        let base_expr = table_col(&dim.data_object, &source_column);
        let expr = match grain {
            Some(grain) => self.dialect.render_time_grain(base_expr, grain),
            None => base_expr,
        };

        Some(ResolvedDimension {
            name: dim_ref.name.clone(),
            object_name: dim.data_object.clone(),
            column_name: dim.column.clone(),
            source_column,
            grain,
            expr,
        })
    }

    /// Resolve a select-list name to a measure or metric. Metric components
    /// land in `result.metric_components`.
    fn resolve_measure_or_metric(
        &self,
        name: &str,
        result: &mut ResolvedQuery,
        issues: &mut Vec<Issue>,
    ) -> CompileResult<Option<ResolvedMeasure>> {
        if let Some(measure) = self.model.measures.get(name) {
            return self.build_measure(name, measure, issues);
        }

        if let Some(metric) = self.model.metrics.get(name) {
            let parsed = match expr_parser::parse_metric_formula(&metric.expression) {
                Ok(expr) => expr,
                Err(err) => {
                    issues.push(
                        Issue::new(ErrorCode::ParseError, format!("Metric '{}': {}", name, err))
                            .with_path(format!("metrics.{}.expression", name)),
                    );
                    return Ok(None);
                }
            };

            let references = expr_parser::name_placeholders(&metric.expression);
            for reference in &references {
                if result.metric_components.contains_key(reference) {
                    continue;
                }
                if let Some(component) =
                    self.resolve_measure_or_metric(reference, result, issues)?
                {
                    result
                        .metric_components
                        .insert(reference.clone(), component);
                }
            }

            return Ok(Some(ResolvedMeasure {
                name: name.to_string(),
                aggregation: None,
                expression: parsed,
                is_expression: true,
                component_measures: references,
                distinct: false,
                total: false,
            }));
        }

        issues.push(
            Issue::new(ErrorCode::UnknownMeasure, format!("Unknown measure '{}'", name))
                .with_path("select.measures")
                .with_related(name.to_string()),
        );
        Ok(None)
    }

    /// Build the aggregate expression for a model measure.
    fn build_measure(
        &self,
        name: &str,
        measure: &Measure,
        issues: &mut Vec<Issue>,
    ) -> CompileResult<Option<ResolvedMeasure>> {
        if measure.aggregation == AggregationType::Mode && self.dialect == Dialect::Dremio {
            return Err(CompileError::UnsupportedFeature(format!(
                "measure '{}': MODE aggregation is not supported on Dremio",
                name
            )));
        }

        let inner = if let Some(formula) = &measure.expression {
            match expr_parser::parse_measure_expression(formula, self.model) {
                Ok(expr) => expr,
                Err(err) => {
                    let code = match err {
                        ExprParseError::Syntax { .. } => ErrorCode::ParseError,
                        _ => ErrorCode::UnresolvedMeasureRef,
                    };
                    issues.push(
                        Issue::new(code, format!("Measure '{}': {}", name, err))
                            .with_path(format!("measures.{}.expression", name)),
                    );
                    return Ok(None);
                }
            }
        } else if let Some(target) = &measure.column {
            table_col(
                &target.data_object,
                &self.model.column_code(&target.data_object, &target.column),
            )
        } else {
            // Neither a column nor an expression: count rows.
            lit_int(1)
        };

        let inner = match &measure.filter {
            Some(filter) => match self.wrap_measure_filter(inner, filter, name, issues) {
                Some(guarded) => guarded,
                None => return Ok(None),
            },
            None => inner,
        };

        let (function, implied_distinct) = measure.aggregation.sql_function();
        let distinct = measure.distinct || implied_distinct;

        let expression = if measure.aggregation == AggregationType::Listagg {
            let delimiter = measure.delimiter.clone().unwrap_or_else(|| ",".to_string());
            let within_group = measure
                .within_group
                .as_ref()
                .map(|wg| {
                    vec![OrderByItem {
                        expr: table_col(
                            &wg.column.data_object,
                            &self
                                .model
                                .column_code(&wg.column.data_object, &wg.column.column),
                        ),
                        desc: wg.order.eq_ignore_ascii_case("desc"),
                    }]
                })
                .unwrap_or_default();
            Expr::Function {
                name: function.to_string(),
                args: vec![inner, lit_str(&delimiter)],
                distinct,
                within_group,
            }
        } else {
            Expr::Function {
                name: function.to_string(),
                args: vec![inner],
                distinct,
                within_group: vec![],
            }
        };

        Ok(Some(ResolvedMeasure {
            name: name.to_string(),
            aggregation: Some(measure.aggregation),
            expression,
            is_expression: measure.expression.is_some(),
            component_measures: vec![],
            distinct,
            total: measure.total,
        }))
    }

    /// Wrap a measure argument in the definition filter's CASE guard.
    fn wrap_measure_filter(
        &self,
        inner: Expr,
        filter: &MeasureFilter,
        measure_name: &str,
        issues: &mut Vec<Issue>,
    ) -> Option<Expr> {
        let Some(target) = &filter.column else {
            issues.push(
                Issue::new(
                    ErrorCode::InvalidFilterValue,
                    format!("Measure '{}' filter is missing a column", measure_name),
                )
                .with_path(format!("measures.{}.filter", measure_name)),
            );
            return None;
        };

        let column = table_col(
            &target.data_object,
            &self.model.column_code(&target.data_object, &target.column),
        );
        let literals: Vec<Expr> = filter.values.iter().map(filter_literal).collect();
        let first = || literals.first().cloned().unwrap_or_else(|| lit_bool(true));

        let condition = match filter.operator {
            FilterOperator::Equals => column.eq(first()),
            FilterOperator::NotEquals => column.ne(first()),
            FilterOperator::Gt => column.gt(first()),
            FilterOperator::Gte => column.gte(first()),
            FilterOperator::Lt => column.lt(first()),
            FilterOperator::Lte => column.lte(first()),
            FilterOperator::InList => column.in_list(literals),
            FilterOperator::NotInList => Expr::InList {
                expr: Box::new(column),
                values: literals,
                negated: true,
            },
            FilterOperator::Set => column.is_not_null(),
            FilterOperator::NotSet => column.is_null(),
            other => {
                issues.push(
                    Issue::new(
                        ErrorCode::UnknownFilterOperator,
                        format!(
                            "Measure '{}' filter operator {:?} is not usable in measure filters",
                            measure_name, other
                        ),
                    )
                    .with_path(format!("measures.{}.filter", measure_name)),
                );
                return None;
            }
        };

        Some(Expr::Case {
            when_clauses: vec![(condition, inner)],
            else_clause: None,
        })
    }

    /// All data objects a measure or metric draws columns from.
    fn measure_source_objects(
        &self,
        name: &str,
        visited: &mut BTreeSet<String>,
    ) -> BTreeSet<String> {
        let mut sources = BTreeSet::new();
        if !visited.insert(name.to_string()) {
            return sources;
        }

        if let Some(measure) = self.model.measures.get(name) {
            if let Some(target) = &measure.column {
                sources.insert(target.data_object.clone());
            }
            if let Some(formula) = &measure.expression {
                for (object, _) in expr_parser::column_placeholders(formula) {
                    sources.insert(object);
                }
            }
            return sources;
        }

        if let Some(metric) = self.model.metrics.get(name) {
            for reference in expr_parser::name_placeholders(&metric.expression) {
                sources.extend(self.measure_source_objects(&reference, visited));
            }
        }

        sources
    }

    /// Pick the base fact: a measure-contributing object, preferring ones
    /// that declare outbound joins, then lexicographic order.
    fn select_base_object(&self, result: &ResolvedQuery) -> String {
        let with_joins = |name: &String| {
            self.model
                .data_objects
                .get(name)
                .map(|obj| !obj.joins.is_empty())
                .unwrap_or(false)
        };

        if !result.measure_source_objects.is_empty() {
            if let Some(fact) = result.measure_source_objects.iter().find(|n| with_joins(n)) {
                return fact.clone();
            }
            if let Some(fact) = result.measure_source_objects.iter().next() {
                return fact.clone();
            }
        }

        // Dimension-only query: any required object with joins, else first.
        if let Some(object) = result.required_objects.iter().find(|n| with_joins(n)) {
            return object.clone();
        }
        if let Some(object) = result.required_objects.iter().next() {
            return object.clone();
        }
        self.model
            .data_objects
            .keys()
            .next()
            .cloned()
            .unwrap_or_default()
    }

    fn check_use_path_names(&self, query: &QueryObject, issues: &mut Vec<Issue>) {
        for upn in &query.use_path_names {
            for side in [&upn.source, &upn.target] {
                if !self.model.data_objects.contains_key(side) {
                    issues.push(
                        Issue::new(
                            ErrorCode::UnknownDataObject,
                            format!("usePathNames references unknown data object '{}'", side),
                        )
                        .with_path("usePathNames"),
                    );
                }
            }
            let Some(source) = self.model.data_objects.get(&upn.source) else {
                continue;
            };
            let found = source.joins.iter().any(|join| {
                join.secondary
                    && join.join_to == upn.target
                    && join.path_name.as_deref() == Some(upn.path_name.as_str())
            });
            if !found {
                issues.push(
                    Issue::new(
                        ErrorCode::UnknownPathName,
                        format!(
                            "No secondary join with pathName '{}' from '{}' to '{}'",
                            upn.path_name, upn.source, upn.target
                        ),
                    )
                    .with_path("usePathNames"),
                );
            }
        }
    }

    /// Classify and resolve a filter: dimension fields become WHERE
    /// predicates, measure/metric fields become HAVING predicates.
    fn resolve_filter(
        &self,
        filter: &QueryFilter,
        result: &mut ResolvedQuery,
        issues: &mut Vec<Issue>,
    ) {
        if let Some(dim) = self.model.dimensions.get(&filter.field) {
            let column = table_col(
                &dim.data_object,
                &self.model.column_code(&dim.data_object, &dim.column),
            );
            if let Some(expression) = self.build_filter_expr(column, filter, issues) {
                result.required_objects.insert(dim.data_object.clone());
                result.where_filters.push(ResolvedFilter {
                    expression,
                    is_aggregate: false,
                    object_name: Some(dim.data_object.clone()),
                });
            }
            return;
        }

        let is_measure = self.model.measures.contains_key(&filter.field);
        let is_metric = self.model.metrics.contains_key(&filter.field);
        if is_measure || is_metric {
            let Some(aggregate) = self.having_target(&filter.field, result, issues) else {
                return;
            };
            if let Some(expression) = self.build_filter_expr(aggregate, filter, issues) {
                result.having_filters.push(ResolvedFilter {
                    expression,
                    is_aggregate: true,
                    object_name: None,
                });
            }
            return;
        }

        issues.push(
            Issue::new(
                ErrorCode::UnknownField,
                format!(
                    "Filter field '{}' is not a dimension, measure, or metric",
                    filter.field
                ),
            )
            .with_path("filters")
            .with_related(filter.field.clone()),
        );
    }

    /// The aggregate expression a HAVING predicate compares against.
    ///
    /// In a star plan this is the full aggregate call over base tables; above
    /// a composite CTE it re-aggregates the leg columns by alias instead.
    fn having_target(
        &self,
        field: &str,
        result: &mut ResolvedQuery,
        issues: &mut Vec<Issue>,
    ) -> Option<Expr> {
        // Resolve the field standalone so HAVING can reference measures that
        // are not in the select list.
        let already = result
            .measures
            .iter()
            .find(|m| m.name == field)
            .cloned()
            .or_else(|| result.metric_components.get(field).cloned());

        let resolved = match already {
            Some(found) => found,
            None => match self.resolve_measure_or_metric(field, result, issues) {
                Ok(Some(found)) => found,
                Ok(None) => return None,
                Err(err) => {
                    issues.push(Issue::new(err.code(), err.to_string()).with_path("filters"));
                    return None;
                }
            },
        };

        if result.requires_cfl {
            if resolved.is_metric() {
                Some(substitute_outer_components(
                    &resolved.expression,
                    &result.metric_components,
                ))
            } else {
                Some(outer_aggregate(&resolved))
            }
        } else if resolved.is_metric() {
            Some(crate::semantic::resolved::substitute_components(
                &resolved.expression,
                &result.metric_components,
            ))
        } else {
            Some(resolved.expression.clone())
        }
    }

    /// Lower an operator + value onto a column expression.
    fn build_filter_expr(
        &self,
        column: Expr,
        filter: &QueryFilter,
        issues: &mut Vec<Issue>,
    ) -> Option<Expr> {
        let invalid = |issues: &mut Vec<Issue>, message: String| {
            issues.push(
                Issue::new(ErrorCode::InvalidFilterValue, message)
                    .with_path("filters")
                    .with_related(filter.field.clone()),
            );
        };

        let scalar = |issues: &mut Vec<Issue>| match filter.value.as_ref().and_then(scalar_literal) {
            Some(lit) => Some(lit),
            None => {
                invalid(
                    issues,
                    format!("Filter on '{}' requires a scalar value", filter.field),
                );
                None
            }
        };

        let pattern_text = |issues: &mut Vec<Issue>| match filter.value.as_ref().and_then(scalar_text)
        {
            Some(text) => Some(text),
            None => {
                invalid(
                    issues,
                    format!("Filter on '{}' requires a string value", filter.field),
                );
                None
            }
        };

        match filter.op {
            FilterOperator::Equals => Some(column.eq(scalar(issues)?)),
            FilterOperator::NotEquals => Some(column.ne(scalar(issues)?)),
            FilterOperator::Gt => Some(column.gt(scalar(issues)?)),
            FilterOperator::Gte => Some(column.gte(scalar(issues)?)),
            FilterOperator::Lt => Some(column.lt(scalar(issues)?)),
            FilterOperator::Lte => Some(column.lte(scalar(issues)?)),

            FilterOperator::InList | FilterOperator::NotInList => {
                let values = match filter.value.as_ref() {
                    Some(FilterValue::List(items)) => {
                        items.iter().filter_map(scalar_literal).collect::<Vec<_>>()
                    }
                    Some(other) => scalar_literal(other).into_iter().collect(),
                    None => vec![],
                };
                Some(Expr::InList {
                    expr: Box::new(column),
                    values,
                    negated: filter.op == FilterOperator::NotInList,
                })
            }

            FilterOperator::Set => Some(column.is_not_null()),
            FilterOperator::NotSet => Some(column.is_null()),

            FilterOperator::Contains => {
                let pattern = scalar(issues)?;
                Some(self.dialect.render_string_contains(column, pattern))
            }
            FilterOperator::NotContains => {
                let pattern = scalar(issues)?;
                Some(self.dialect.render_string_contains(column, pattern).not())
            }

            FilterOperator::StartsWith => {
                let text = pattern_text(issues)?;
                Some(column.like(lit_str(&format!("{}%", text))))
            }
            FilterOperator::EndsWith => {
                let text = pattern_text(issues)?;
                Some(column.like(lit_str(&format!("%{}", text))))
            }
            FilterOperator::Like => {
                let text = pattern_text(issues)?;
                Some(column.like(lit_str(&text)))
            }
            FilterOperator::NotLike => {
                let text = pattern_text(issues)?;
                Some(column.binop(crate::sql::BinaryOperator::NotLike, lit_str(&text)))
            }

            FilterOperator::Between | FilterOperator::NotBetween => {
                let bounds = match filter.value.as_ref() {
                    Some(FilterValue::List(items)) if items.len() == 2 => {
                        match (scalar_literal(&items[0]), scalar_literal(&items[1])) {
                            (Some(low), Some(high)) => Some((low, high)),
                            _ => None,
                        }
                    }
                    _ => None,
                };
                let Some((low, high)) = bounds else {
                    invalid(
                        issues,
                        format!(
                            "Filter on '{}' requires a two-element list for between",
                            filter.field
                        ),
                    );
                    return None;
                };
                Some(Expr::Between {
                    expr: Box::new(column),
                    low: Box::new(low),
                    high: Box::new(high),
                    negated: filter.op == FilterOperator::NotBetween,
                })
            }

            FilterOperator::Relative => {
                let Some(FilterValue::Relative(spec)) = filter.value.as_ref() else {
                    invalid(
                        issues,
                        format!(
                            "Relative filter on '{}' requires {{unit, count, direction?, include_current?}}",
                            filter.field
                        ),
                    );
                    return None;
                };
                if spec.count <= 0 {
                    invalid(
                        issues,
                        format!(
                            "Relative filter on '{}' requires a positive count",
                            filter.field
                        ),
                    );
                    return None;
                }
                Some(self.relative_range(column, spec))
            }
        }
    }

    /// Expand a relative filter into a half-open range over the dialect's
    /// current-date and date-add fragments.
    fn relative_range(&self, column: Expr, spec: &RelativeSpec) -> Expr {
        let base = self.dialect.current_date_sql();
        let (start, end) = match spec.direction {
            RelativeDirection::Future => {
                let start = if spec.include_current {
                    base.to_string()
                } else {
                    self.dialect.date_add_sql(base, RelativeUnit::Day, 1)
                };
                let end = self.dialect.date_add_sql(&start, spec.unit, spec.count);
                (start, end)
            }
            RelativeDirection::Past => {
                let end = if spec.include_current {
                    self.dialect.date_add_sql(base, RelativeUnit::Day, 1)
                } else {
                    base.to_string()
                };
                let start = self.dialect.date_add_sql(&end, spec.unit, -spec.count);
                (start, end)
            }
        };

        Expr::Paren(Box::new(
            column
                .clone()
                .gte(raw_sql(&start))
                .and(column.lt(raw_sql(&end))),
        ))
    }
}

/// Scalar filter value to AST literal.
fn scalar_literal(value: &FilterValue) -> Option<Expr> {
    match value {
        FilterValue::Bool(b) => Some(lit_bool(*b)),
        FilterValue::Int(n) => Some(lit_int(*n)),
        FilterValue::Float(f) => Some(lit_float(*f)),
        FilterValue::String(s) => Some(lit_str(s)),
        FilterValue::List(_) | FilterValue::Relative(_) => None,
    }
}

/// Scalar filter value as pattern text.
fn scalar_text(value: &FilterValue) -> Option<String> {
    match value {
        FilterValue::String(s) => Some(s.clone()),
        FilterValue::Int(n) => Some(n.to_string()),
        FilterValue::Float(f) => Some(f.to_string()),
        FilterValue::Bool(b) => Some(b.to_string()),
        FilterValue::List(_) | FilterValue::Relative(_) => None,
    }
}

/// Measure-definition filter literal to AST literal.
fn filter_literal(value: &FilterLiteral) -> Expr {
    match value {
        FilterLiteral::Bool(b) => lit_bool(*b),
        FilterLiteral::Int(n) => lit_int(*n),
        FilterLiteral::Float(f) => lit_float(*f),
        FilterLiteral::String(s) => lit_str(s),
    }
}
