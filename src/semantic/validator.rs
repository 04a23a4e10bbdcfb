//! Semantic model validation.
//!
//! Runs before any query is compiled against a model. Produces the complete
//! ordered list of issues rather than stopping at the first, so a model
//! author sees every problem in one pass.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::error::{ErrorCode, Issue};
use crate::model::loader::SourceMap;
use crate::model::SemanticModel;
use crate::semantic::expr_parser::{self, ExprParseError};

/// Validates model invariants: identifier uniqueness, join topology,
/// secondary-join constraints, and reference resolution.
pub struct SemanticValidator;

impl SemanticValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a model, attaching source spans where the map has them.
    pub fn validate(&self, model: &SemanticModel, source_map: Option<&SourceMap>) -> Vec<Issue> {
        let mut issues = Vec::new();
        issues.extend(self.check_unique_identifiers(model));
        issues.extend(self.check_unique_columns(model));
        issues.extend(self.check_join_structure(model));
        issues.extend(self.check_no_cyclic_joins(model));
        issues.extend(self.check_no_multipath_joins(model));
        issues.extend(self.check_secondary_joins(model));
        issues.extend(self.check_measure_refs(model));
        issues.extend(self.check_dimension_refs(model));
        issues.extend(self.check_metric_refs(model));

        if let Some(map) = source_map {
            for issue in &mut issues {
                if issue.span.is_none() {
                    if let Some(span) = issue.path.as_deref().and_then(|p| map.get(p)) {
                        issue.span = Some(span.clone());
                    }
                }
            }
        }

        issues
    }

    /// No name collisions across data objects, dimensions, measures, metrics.
    fn check_unique_identifiers(&self, model: &SemanticModel) -> Vec<Issue> {
        let mut issues = Vec::new();
        let mut seen: BTreeMap<&str, &str> = BTreeMap::new();

        let buckets: [(&str, Vec<&String>); 4] = [
            ("dataObject", model.data_objects.keys().collect()),
            ("dimension", model.dimensions.keys().collect()),
            ("measure", model.measures.keys().collect()),
            ("metric", model.metrics.keys().collect()),
        ];

        for (kind, names) in buckets {
            for name in names {
                if let Some(existing) = seen.get(name.as_str()) {
                    issues.push(
                        Issue::new(
                            ErrorCode::DuplicateName,
                            format!("{} '{}' conflicts with existing {} '{}'", kind, name, existing, name),
                        )
                        .with_path(format!("{}s.{}", kind, name))
                        .with_related(name.clone()),
                    );
                } else {
                    seen.insert(name.as_str(), kind);
                }
            }
        }

        issues
    }

    /// Column display names unique within each data object.
    fn check_unique_columns(&self, model: &SemanticModel) -> Vec<Issue> {
        let mut issues = Vec::new();
        for (obj_name, obj) in &model.data_objects {
            let mut seen: BTreeSet<&str> = BTreeSet::new();
            for (col_name, col) in &obj.columns {
                if !seen.insert(col.label.as_str()) {
                    issues.push(
                        Issue::new(
                            ErrorCode::NonUniqueColumn,
                            format!(
                                "Column label '{}' appears more than once in data object '{}'",
                                col.label, obj_name
                            ),
                        )
                        .with_path(format!("dataObjects.{}.columns.{}", obj_name, col_name)),
                    );
                }
            }
        }
        issues
    }

    /// Join targets resolve, referenced columns exist, column lists match.
    fn check_join_structure(&self, model: &SemanticModel) -> Vec<Issue> {
        let mut issues = Vec::new();
        for (obj_name, obj) in &model.data_objects {
            for (i, join) in obj.joins.iter().enumerate() {
                let path = format!("dataObjects.{}.joins", obj_name);

                if join.columns_from.is_empty()
                    || join.columns_from.len() != join.columns_to.len()
                {
                    issues.push(
                        Issue::new(
                            ErrorCode::JoinColumnCountMismatch,
                            format!(
                                "Data object '{}' join[{}] has {} columnsFrom and {} columnsTo",
                                obj_name,
                                i,
                                join.columns_from.len(),
                                join.columns_to.len()
                            ),
                        )
                        .with_path(path.clone()),
                    );
                }

                let Some(target) = model.data_objects.get(&join.join_to) else {
                    issues.push(
                        Issue::new(
                            ErrorCode::UnknownJoinTarget,
                            format!(
                                "Data object '{}' join[{}] references unknown data object '{}'",
                                obj_name, i, join.join_to
                            ),
                        )
                        .with_path(path)
                        .with_related(join.join_to.clone()),
                    );
                    continue;
                };

                for col in &join.columns_from {
                    if !obj.columns.contains_key(col) {
                        issues.push(
                            Issue::new(
                                ErrorCode::UnknownJoinColumn,
                                format!(
                                    "Data object '{}' join[{}] columnsFrom references unknown column '{}'",
                                    obj_name, i, col
                                ),
                            )
                            .with_path(path.clone()),
                        );
                    }
                }
                for col in &join.columns_to {
                    if !target.columns.contains_key(col) {
                        issues.push(
                            Issue::new(
                                ErrorCode::UnknownJoinColumn,
                                format!(
                                    "Data object '{}' join[{}] columnsTo references unknown column '{}' in '{}'",
                                    obj_name, i, col, join.join_to
                                ),
                            )
                            .with_path(path.clone()),
                        );
                    }
                }
            }
        }
        issues
    }

    /// The primary join graph must be acyclic. DFS on the directed
    /// projection (declared edges only).
    fn check_no_cyclic_joins(&self, model: &SemanticModel) -> Vec<Issue> {
        let adjacency = primary_adjacency(model);
        let mut issues = Vec::new();
        let mut visited: BTreeSet<&str> = BTreeSet::new();

        for start in adjacency.keys().copied() {
            if visited.contains(start) {
                continue;
            }
            // Iterative DFS with per-frame child cursors so the recursion
            // stack doubles as the current path.
            let mut stack: Vec<(&str, usize)> = vec![(start, 0)];
            let mut on_path: BTreeSet<&str> = BTreeSet::new();
            on_path.insert(start);
            visited.insert(start);

            while !stack.is_empty() {
                let frame = stack.len() - 1;
                let (node, child_idx) = stack[frame];
                let children = adjacency.get(node).map(|c| c.as_slice()).unwrap_or(&[]);

                if child_idx >= children.len() {
                    on_path.remove(node);
                    stack.pop();
                    continue;
                }
                stack[frame].1 += 1;
                let next = children[child_idx].as_str();

                if on_path.contains(next) {
                    let path: Vec<&str> = stack.iter().map(|(n, _)| *n).collect();
                    let cycle_start = path.iter().position(|n| *n == next).unwrap_or(0);
                    let mut cycle: Vec<&str> = path[cycle_start..].to_vec();
                    cycle.push(next);
                    issues.push(
                        Issue::new(
                            ErrorCode::CyclicJoin,
                            format!("Cyclic join detected: {}", cycle.join(" -> ")),
                        )
                        .with_path(format!("dataObjects.{}.joins", next)),
                    );
                } else if !visited.contains(next) {
                    visited.insert(next);
                    on_path.insert(next);
                    stack.push((next, 0));
                }
            }
        }

        issues
    }

    /// Reject diamonds: multiple primary paths between a pair of objects.
    ///
    /// Canonical exception: when the start has a direct edge to the target,
    /// the direct join is the one path that counts and an additional
    /// indirect route is not ambiguous.
    fn check_no_multipath_joins(&self, model: &SemanticModel) -> Vec<Issue> {
        let adjacency = primary_adjacency(model);
        let mut issues = Vec::new();
        let mut reported: BTreeSet<(String, String)> = BTreeSet::new();

        for (&start, direct) in &adjacency {
            if direct.is_empty() {
                continue;
            }
            let direct_neighbors: BTreeSet<&str> = direct.iter().map(|s| s.as_str()).collect();
            let mut first_parent: BTreeMap<&str, &str> = BTreeMap::new();
            let mut queue: VecDeque<&str> = VecDeque::new();

            for neighbor in direct.iter().map(|s| s.as_str()) {
                if neighbor == start {
                    continue;
                }
                if !first_parent.contains_key(neighbor) {
                    first_parent.insert(neighbor, start);
                    queue.push_back(neighbor);
                }
            }

            while let Some(node) = queue.pop_front() {
                let children = adjacency.get(node).map(|c| c.as_slice()).unwrap_or(&[]);
                for neighbor in children.iter().map(|s| s.as_str()) {
                    if neighbor == start {
                        continue;
                    }
                    match first_parent.get(neighbor).copied() {
                        None => {
                            first_parent.insert(neighbor, node);
                            queue.push_back(neighbor);
                        }
                        Some(parent) if parent != node => {
                            if direct_neighbors.contains(neighbor) {
                                continue;
                            }
                            let pair = (start.to_string(), neighbor.to_string());
                            if reported.insert(pair) {
                                issues.push(
                                    Issue::new(
                                        ErrorCode::MultipathJoin,
                                        format!(
                                            "Multiple join paths from '{}' to '{}' (via '{}' and '{}')",
                                            start, neighbor, parent, node
                                        ),
                                    )
                                    .with_path(format!("dataObjects.{}.joins", start)),
                                );
                            }
                        }
                        Some(_) => {}
                    }
                }
            }
        }

        issues
    }

    /// Secondary joins carry a path name; (source, target, path) is unique.
    fn check_secondary_joins(&self, model: &SemanticModel) -> Vec<Issue> {
        let mut issues = Vec::new();
        let mut seen: BTreeSet<(String, String, String)> = BTreeSet::new();

        for (obj_name, obj) in &model.data_objects {
            for (i, join) in obj.joins.iter().enumerate() {
                if !join.secondary {
                    continue;
                }
                match &join.path_name {
                    None => {
                        issues.push(
                            Issue::new(
                                ErrorCode::SecondaryMissingPathname,
                                format!(
                                    "Secondary join[{}] from '{}' to '{}' is missing a pathName",
                                    i, obj_name, join.join_to
                                ),
                            )
                            .with_path(format!("dataObjects.{}.joins", obj_name)),
                        );
                    }
                    Some(path_name) => {
                        let key = (obj_name.clone(), join.join_to.clone(), path_name.clone());
                        if !seen.insert(key) {
                            issues.push(
                                Issue::new(
                                    ErrorCode::DuplicateSecondaryPath,
                                    format!(
                                        "Duplicate secondary path '{}' from '{}' to '{}'",
                                        path_name, obj_name, join.join_to
                                    ),
                                )
                                .with_path(format!("dataObjects.{}.joins", obj_name)),
                            );
                        }
                    }
                }
            }
        }

        issues
    }

    /// Measure column references and expression placeholders resolve.
    fn check_measure_refs(&self, model: &SemanticModel) -> Vec<Issue> {
        let mut issues = Vec::new();
        for (name, measure) in &model.measures {
            let path = format!("measures.{}", name);

            if let Some(target) = &measure.column {
                match model.data_objects.get(&target.data_object) {
                    None => issues.push(
                        Issue::new(
                            ErrorCode::UnresolvedMeasureRef,
                            format!(
                                "Measure '{}' references unknown data object '{}'",
                                name, target.data_object
                            ),
                        )
                        .with_path(path.clone())
                        .with_related(target.data_object.clone()),
                    ),
                    Some(obj) if !obj.columns.contains_key(&target.column) => issues.push(
                        Issue::new(
                            ErrorCode::UnresolvedMeasureRef,
                            format!(
                                "Measure '{}' references unknown column '{}' on '{}'",
                                name, target.column, target.data_object
                            ),
                        )
                        .with_path(path.clone()),
                    ),
                    Some(_) => {}
                }
            }

            if let Some(formula) = &measure.expression {
                if let Err(err) = expr_parser::parse_measure_expression(formula, model) {
                    let code = match err {
                        ExprParseError::Syntax { .. } => ErrorCode::ParseError,
                        _ => ErrorCode::UnresolvedMeasureRef,
                    };
                    issues.push(
                        Issue::new(code, format!("Measure '{}': {}", name, err))
                            .with_path(format!("measures.{}.expression", name)),
                    );
                }
            }
        }
        issues
    }

    /// Dimension (dataObject, column) references resolve.
    fn check_dimension_refs(&self, model: &SemanticModel) -> Vec<Issue> {
        let mut issues = Vec::new();
        for (name, dim) in &model.dimensions {
            let path = format!("dimensions.{}", name);
            match model.data_objects.get(&dim.data_object) {
                None => issues.push(
                    Issue::new(
                        ErrorCode::UnresolvedDimensionRef,
                        format!(
                            "Dimension '{}' references unknown data object '{}'",
                            name, dim.data_object
                        ),
                    )
                    .with_path(path)
                    .with_related(dim.data_object.clone()),
                ),
                Some(obj) if !dim.column.is_empty() && !obj.columns.contains_key(&dim.column) => {
                    issues.push(
                        Issue::new(
                            ErrorCode::UnresolvedDimensionRef,
                            format!(
                                "Dimension '{}' references unknown column '{}' on '{}'",
                                name, dim.column, dim.data_object
                            ),
                        )
                        .with_path(path),
                    );
                }
                Some(_) => {}
            }
        }
        issues
    }

    /// Metric placeholders resolve to measures or metrics, and the
    /// metric-to-metric reference graph is acyclic.
    fn check_metric_refs(&self, model: &SemanticModel) -> Vec<Issue> {
        let mut issues = Vec::new();

        for (name, metric) in &model.metrics {
            let path = format!("metrics.{}.expression", name);

            if let Err(err) = expr_parser::parse_metric_formula(&metric.expression) {
                issues.push(
                    Issue::new(ErrorCode::ParseError, format!("Metric '{}': {}", name, err))
                        .with_path(path.clone()),
                );
                continue;
            }

            for reference in expr_parser::name_placeholders(&metric.expression) {
                if !model.measures.contains_key(&reference) && !model.metrics.contains_key(&reference)
                {
                    issues.push(
                        Issue::new(
                            ErrorCode::UnresolvedMeasureRef,
                            format!(
                                "Metric '{}' references unknown measure '{}'",
                                name, reference
                            ),
                        )
                        .with_path(path.clone())
                        .with_related(reference),
                    );
                }
            }
        }

        // Cycle check over metric -> metric references.
        for start in model.metrics.keys() {
            let mut stack = vec![start.clone()];
            let mut on_path: BTreeSet<String> = BTreeSet::new();
            if self.metric_dfs(model, start, &mut stack, &mut on_path, &mut issues) {
                break;
            }
        }

        issues
    }

    fn metric_dfs(
        &self,
        model: &SemanticModel,
        current: &str,
        stack: &mut Vec<String>,
        on_path: &mut BTreeSet<String>,
        issues: &mut Vec<Issue>,
    ) -> bool {
        if !on_path.insert(current.to_string()) {
            issues.push(
                Issue::new(
                    ErrorCode::MetricCycle,
                    format!("Metric reference cycle: {}", stack.join(" -> ")),
                )
                .with_path(format!("metrics.{}.expression", current)),
            );
            return true;
        }

        if let Some(metric) = model.metrics.get(current) {
            for reference in expr_parser::name_placeholders(&metric.expression) {
                if model.metrics.contains_key(&reference) {
                    stack.push(reference.clone());
                    if self.metric_dfs(model, &reference, stack, on_path, issues) {
                        return true;
                    }
                    stack.pop();
                }
            }
        }

        on_path.remove(current);
        false
    }
}

impl Default for SemanticValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Adjacency over primary (non-secondary) joins, in declared direction.
fn primary_adjacency(model: &SemanticModel) -> BTreeMap<&str, Vec<String>> {
    let mut adjacency: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for (obj_name, obj) in &model.data_objects {
        let entry = adjacency.entry(obj_name).or_default();
        for join in &obj.joins {
            if !join.secondary {
                entry.push(join.join_to.clone());
            }
        }
    }
    adjacency
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::loader::from_yaml_str;

    fn validate_yaml(yaml: &str) -> Vec<Issue> {
        let loaded = from_yaml_str(yaml, "model.yaml").unwrap();
        SemanticValidator::new().validate(&loaded.model, Some(&loaded.source_map))
    }

    fn codes(issues: &[Issue]) -> Vec<ErrorCode> {
        issues.iter().map(|i| i.code).collect()
    }

    const OBJ_HEADER: &str = r#"
    label: {L}
    code: {L}
    database: D
    schema: S
"#;

    fn obj(label: &str, extra: &str) -> String {
        format!(
            "  {}:\n{}{}",
            label,
            OBJ_HEADER.replace("{L}", label),
            extra
        )
    }

    #[test]
    fn test_valid_model_is_clean() {
        let yaml = r#"
dataObjects:
  Customers:
    label: Customers
    code: CUSTOMERS
    database: D
    schema: S
    columns:
      Customer Id:
        label: Customer Id
        code: CUSTOMER_ID
        abstractType: int
  Orders:
    label: Orders
    code: ORDERS
    database: D
    schema: S
    columns:
      Customer Id:
        label: Customer Id
        code: CUSTOMER_ID
        abstractType: int
      Price:
        label: Price
        code: PRICE
        abstractType: float
    joins:
      - joinType: many-to-one
        joinTo: Customers
        columnsFrom: [Customer Id]
        columnsTo: [Customer Id]
measures:
  Revenue:
    label: Revenue
    resultType: float
    aggregation: sum
    expression: "{[Orders].[Price]}"
"#;
        assert!(validate_yaml(yaml).is_empty());
    }

    #[test]
    fn test_duplicate_name_across_buckets() {
        let yaml = r#"
dataObjects:
  Revenue:
    label: Revenue
    code: R
    database: D
    schema: S
measures:
  Revenue:
    label: Revenue
    column:
      dataObject: Revenue
      column: X
    resultType: float
    aggregation: sum
"#;
        let issues = validate_yaml(yaml);
        assert!(codes(&issues).contains(&ErrorCode::DuplicateName));
    }

    #[test]
    fn test_cyclic_join_rejected() {
        let yaml = format!(
            "dataObjects:\n{}{}",
            obj(
                "A",
                "    columns:\n      K:\n        label: K\n        code: K\n        abstractType: int\n    joins:\n      - joinType: many-to-one\n        joinTo: B\n        columnsFrom: [K]\n        columnsTo: [K]\n"
            ),
            obj(
                "B",
                "    columns:\n      K:\n        label: K\n        code: K\n        abstractType: int\n    joins:\n      - joinType: many-to-one\n        joinTo: A\n        columnsFrom: [K]\n        columnsTo: [K]\n"
            )
        );
        let issues = validate_yaml(&yaml);
        assert!(codes(&issues).contains(&ErrorCode::CyclicJoin));
    }

    #[test]
    fn test_diamond_rejected_but_canonical_direct_edge_allowed() {
        // Diamond: A -> B -> T and A -> C -> T, no direct A -> T.
        let cols = "    columns:\n      K:\n        label: K\n        code: K\n        abstractType: int\n";
        let join_to = |t: &str| {
            format!(
                "      - joinType: many-to-one\n        joinTo: {}\n        columnsFrom: [K]\n        columnsTo: [K]\n",
                t
            )
        };
        let diamond = format!(
            "dataObjects:\n{}{}{}{}",
            obj("A", &format!("{}    joins:\n{}{}", cols, join_to("B"), join_to("C"))),
            obj("B", &format!("{}    joins:\n{}", cols, join_to("T"))),
            obj("C", &format!("{}    joins:\n{}", cols, join_to("T"))),
            obj("T", cols)
        );
        let issues = validate_yaml(&diamond);
        assert!(codes(&issues).contains(&ErrorCode::MultipathJoin));

        // Canonical: direct A -> T plus indirect A -> B -> T is allowed.
        let canonical = format!(
            "dataObjects:\n{}{}{}",
            obj(
                "A",
                &format!("{}    joins:\n{}{}", cols, join_to("T"), join_to("B"))
            ),
            obj("B", &format!("{}    joins:\n{}", cols, join_to("T"))),
            obj("T", cols)
        );
        let issues = validate_yaml(&canonical);
        assert!(!codes(&issues).contains(&ErrorCode::MultipathJoin));
    }

    #[test]
    fn test_secondary_join_constraints() {
        let cols = "    columns:\n      K:\n        label: K\n        code: K\n        abstractType: int\n";
        let yaml = format!(
            "dataObjects:\n{}{}",
            obj(
                "A",
                &format!(
                    "{}    joins:\n      - joinType: many-to-one\n        joinTo: B\n        columnsFrom: [K]\n        columnsTo: [K]\n        secondary: true\n      - joinType: many-to-one\n        joinTo: B\n        columnsFrom: [K]\n        columnsTo: [K]\n        secondary: true\n        pathName: alt\n      - joinType: many-to-one\n        joinTo: B\n        columnsFrom: [K]\n        columnsTo: [K]\n        secondary: true\n        pathName: alt\n",
                    cols
                )
            ),
            obj("B", cols)
        );
        let issues = validate_yaml(&yaml);
        let issue_codes = codes(&issues);
        assert!(issue_codes.contains(&ErrorCode::SecondaryMissingPathname));
        assert!(issue_codes.contains(&ErrorCode::DuplicateSecondaryPath));
    }

    #[test]
    fn test_unknown_join_target_and_column() {
        let cols = "    columns:\n      K:\n        label: K\n        code: K\n        abstractType: int\n";
        let yaml = format!(
            "dataObjects:\n{}{}",
            obj(
                "A",
                &format!(
                    "{}    joins:\n      - joinType: many-to-one\n        joinTo: Nowhere\n        columnsFrom: [K]\n        columnsTo: [K]\n      - joinType: many-to-one\n        joinTo: B\n        columnsFrom: [Missing]\n        columnsTo: [K]\n",
                    cols
                )
            ),
            obj("B", cols)
        );
        let issues = validate_yaml(&yaml);
        let issue_codes = codes(&issues);
        assert!(issue_codes.contains(&ErrorCode::UnknownJoinTarget));
        assert!(issue_codes.contains(&ErrorCode::UnknownJoinColumn));
    }

    #[test]
    fn test_unresolved_refs() {
        let yaml = r#"
dataObjects:
  Orders:
    label: Orders
    code: ORDERS
    database: D
    schema: S
    columns:
      Price:
        label: Price
        code: PRICE
        abstractType: float
dimensions:
  Country:
    label: Country
    dataObject: Customers
    column: Country
    resultType: string
measures:
  Bad:
    label: Bad
    resultType: float
    aggregation: sum
    expression: "{[Orders].[Missing]}"
"#;
        let issues = validate_yaml(yaml);
        let issue_codes = codes(&issues);
        assert!(issue_codes.contains(&ErrorCode::UnresolvedDimensionRef));
        assert!(issue_codes.contains(&ErrorCode::UnresolvedMeasureRef));
    }

    #[test]
    fn test_metric_cycle_detected() {
        let yaml = r#"
metrics:
  A:
    label: A
    expression: "{[B]} + 1"
  B:
    label: B
    expression: "{[A]} * 2"
"#;
        let issues = validate_yaml(yaml);
        assert!(codes(&issues).contains(&ErrorCode::MetricCycle));
    }

    #[test]
    fn test_issue_carries_span() {
        let yaml = r#"
dataObjects:
  Orders:
    label: Orders
    code: ORDERS
    database: D
    schema: S
dimensions:
  Country:
    label: Country
    dataObject: Customers
    column: Country
    resultType: string
"#;
        let issues = validate_yaml(yaml);
        let dim_issue = issues
            .iter()
            .find(|i| i.code == ErrorCode::UnresolvedDimensionRef)
            .unwrap();
        let span = dim_issue.span.as_ref().expect("span attached from source map");
        assert_eq!(span.line, 9);
    }
}
