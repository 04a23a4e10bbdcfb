//! Join graph over data objects, used for join-path routing.
//!
//! Primary joins become a pair of directed edges (forward plus a reverse
//! edge flagged `reversed`), so BFS can traverse relationships in either
//! direction while fanout detection still knows the declared orientation.
//! Secondary joins live in a separate map keyed by
//! `(source, target, path name)` and are substituted into steps when a
//! query-level override selects them.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::error::{CompileError, CompileResult};
use crate::model::{JoinDef, SemanticModel, UsePathName};
use crate::model::types::Cardinality;
use crate::sql::expr::{and_all, lit_bool, table_col, Expr, ExprExt};

/// A single step in a resolved join path, in traversal order.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinStep {
    pub from_object: String,
    pub to_object: String,
    /// Column display names on the traversal-from side.
    pub from_columns: Vec<String>,
    /// Column display names on the traversal-to side.
    pub to_columns: Vec<String>,
    /// Cardinality as declared on the owning join definition.
    pub cardinality: Cardinality,
    /// Set when the edge was traversed against its declared direction.
    pub reversed: bool,
    /// Set when a secondary join was substituted for this step.
    pub path_name: Option<String>,
}

#[derive(Debug, Clone)]
struct EdgeData {
    columns_from: Vec<String>,
    columns_to: Vec<String>,
    cardinality: Cardinality,
    reversed: bool,
}

/// Graph of data objects (nodes) and primary joins (edges).
pub struct JoinGraph<'a> {
    model: &'a SemanticModel,
    graph: DiGraph<String, EdgeData>,
    node_indices: BTreeMap<String, NodeIndex>,
    /// Secondary joins: (source, target) -> path name -> definition.
    secondary: BTreeMap<(String, String), BTreeMap<String, JoinDef>>,
    /// Active overrides: (source, target) -> path name.
    overrides: BTreeMap<(String, String), String>,
}

impl<'a> JoinGraph<'a> {
    pub fn new(model: &'a SemanticModel, use_path_names: &[UsePathName]) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = BTreeMap::new();
        let mut secondary: BTreeMap<(String, String), BTreeMap<String, JoinDef>> = BTreeMap::new();

        for name in model.data_objects.keys() {
            let idx = graph.add_node(name.clone());
            node_indices.insert(name.clone(), idx);
        }

        for (obj_name, obj) in &model.data_objects {
            for join in &obj.joins {
                if join.secondary {
                    if let Some(path_name) = &join.path_name {
                        secondary
                            .entry((obj_name.clone(), join.join_to.clone()))
                            .or_default()
                            .insert(path_name.clone(), join.clone());
                    }
                    continue;
                }
                let (Some(&from_idx), Some(&to_idx)) =
                    (node_indices.get(obj_name), node_indices.get(&join.join_to))
                else {
                    continue;
                };

                graph.add_edge(
                    from_idx,
                    to_idx,
                    EdgeData {
                        columns_from: join.columns_from.clone(),
                        columns_to: join.columns_to.clone(),
                        cardinality: join.join_type,
                        reversed: false,
                    },
                );
                graph.add_edge(
                    to_idx,
                    from_idx,
                    EdgeData {
                        columns_from: join.columns_to.clone(),
                        columns_to: join.columns_from.clone(),
                        cardinality: join.join_type,
                        reversed: true,
                    },
                );
            }
        }

        let overrides = use_path_names
            .iter()
            .map(|upn| ((upn.source.clone(), upn.target.clone()), upn.path_name.clone()))
            .collect();

        Self {
            model,
            graph,
            node_indices,
            secondary,
            overrides,
        }
    }

    /// Look up a secondary join definition.
    pub fn secondary_join(&self, source: &str, target: &str, path_name: &str) -> Option<&JoinDef> {
        self.secondary
            .get(&(source.to_string(), target.to_string()))
            .and_then(|paths| paths.get(path_name))
    }

    /// Compute a minimum-edge join path connecting the base set to every
    /// required object.
    ///
    /// One `JoinStep` per traversed edge, in traversal order, deduplicated.
    /// Each reached target joins the source set for subsequent targets, so
    /// shared path prefixes are emitted once.
    pub fn find_join_path(
        &self,
        from_objects: &BTreeSet<String>,
        to_objects: &BTreeSet<String>,
    ) -> CompileResult<Vec<JoinStep>> {
        let mut steps: Vec<JoinStep> = Vec::new();
        let mut visited_edges: BTreeSet<(String, String)> = BTreeSet::new();
        let mut sources: Vec<String> = from_objects.iter().cloned().collect();

        for target in to_objects.difference(from_objects) {
            let mut best: Option<(Vec<NodeIndex>, usize, &str)> = None;
            for source in &sources {
                if let Some((path, count)) = self.shortest_path(source, target) {
                    let better = match &best {
                        None => true,
                        Some((existing, _, _)) => path.len() < existing.len(),
                    };
                    if better {
                        best = Some((path, count, source.as_str()));
                    }
                }
            }

            let Some((path, count, source)) = best else {
                continue;
            };

            if count > 1 && !self.has_direct_edge(source, target) {
                return Err(CompileError::AmbiguousJoin(format!(
                    "'{}' is reachable from '{}' by {} shortest paths; \
                     add a direct join or select a pathName",
                    target, source, count
                )));
            }

            for pair in path.windows(2) {
                let from_name = self.graph[pair[0]].clone();
                let to_name = self.graph[pair[1]].clone();
                let key = normalize_pair(&from_name, &to_name);
                if !visited_edges.insert(key) {
                    continue;
                }

                let edge = self
                    .graph
                    .find_edge(pair[0], pair[1])
                    .expect("path edges exist in the graph");
                let data = &self.graph[edge];

                let mut step = JoinStep {
                    from_object: from_name,
                    to_object: to_name,
                    from_columns: data.columns_from.clone(),
                    to_columns: data.columns_to.clone(),
                    cardinality: data.cardinality,
                    reversed: data.reversed,
                    path_name: None,
                };
                self.apply_override(&mut step);
                steps.push(step);
            }

            sources.push(target.clone());
        }

        Ok(steps)
    }

    /// Substitute an active secondary join for this step's edge, if one is
    /// selected for the pair in either declared direction.
    fn apply_override(&self, step: &mut JoinStep) {
        let forward = (step.from_object.clone(), step.to_object.clone());
        if let Some(path_name) = self.overrides.get(&forward) {
            if let Some(def) = self.secondary_join(&step.from_object, &step.to_object, path_name) {
                step.from_columns = def.columns_from.clone();
                step.to_columns = def.columns_to.clone();
                step.cardinality = def.join_type;
                step.reversed = false;
                step.path_name = Some(path_name.clone());
            }
            return;
        }

        let backward = (step.to_object.clone(), step.from_object.clone());
        if let Some(path_name) = self.overrides.get(&backward) {
            if let Some(def) = self.secondary_join(&step.to_object, &step.from_object, path_name) {
                step.from_columns = def.columns_to.clone();
                step.to_columns = def.columns_from.clone();
                step.cardinality = def.join_type;
                step.reversed = true;
                step.path_name = Some(path_name.clone());
            }
        }
    }

    /// BFS shortest path with parent pointers plus shortest-path counting.
    ///
    /// Neighbors expand in lexicographic target order so tie-breaks are
    /// stable across runs.
    fn shortest_path(&self, from: &str, to: &str) -> Option<(Vec<NodeIndex>, usize)> {
        let from_idx = *self.node_indices.get(from)?;
        let to_idx = *self.node_indices.get(to)?;
        if from_idx == to_idx {
            return Some((vec![from_idx], 1));
        }

        let mut dist: HashMap<NodeIndex, usize> = HashMap::new();
        let mut count: HashMap<NodeIndex, usize> = HashMap::new();
        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue: VecDeque<NodeIndex> = VecDeque::new();

        dist.insert(from_idx, 0);
        count.insert(from_idx, 1);
        queue.push_back(from_idx);

        while let Some(current) = queue.pop_front() {
            let current_dist = dist[&current];
            let current_count = count[&current];

            let mut neighbors: Vec<NodeIndex> =
                self.graph.edges(current).map(|e| e.target()).collect();
            neighbors.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
            neighbors.dedup();

            for neighbor in neighbors {
                match dist.get(&neighbor) {
                    None => {
                        dist.insert(neighbor, current_dist + 1);
                        count.insert(neighbor, current_count);
                        parent.insert(neighbor, current);
                        queue.push_back(neighbor);
                    }
                    Some(&d) if d == current_dist + 1 => {
                        *count.entry(neighbor).or_insert(0) += current_count;
                    }
                    Some(_) => {}
                }
            }
        }

        dist.get(&to_idx)?;
        let mut path = vec![to_idx];
        let mut current = to_idx;
        while current != from_idx {
            current = parent[&current];
            path.push(current);
        }
        path.reverse();
        Some((path, count[&to_idx]))
    }

    fn has_direct_edge(&self, from: &str, to: &str) -> bool {
        match (self.node_indices.get(from), self.node_indices.get(to)) {
            (Some(&a), Some(&b)) => self.graph.find_edge(a, b).is_some(),
            _ => false,
        }
    }

    /// Build the ON clause for a join step: AND-chained equalities over the
    /// physical column codes of each column pair.
    pub fn build_on_condition(&self, step: &JoinStep) -> Expr {
        let conditions = step
            .from_columns
            .iter()
            .zip(step.to_columns.iter())
            .map(|(from_col, to_col)| {
                let left = table_col(
                    &step.from_object,
                    &self.model.column_code(&step.from_object, from_col),
                );
                let right = table_col(
                    &step.to_object,
                    &self.model.column_code(&step.to_object, to_col),
                );
                left.eq(right)
            });
        and_all(conditions).unwrap_or_else(|| lit_bool(true))
    }
}

fn normalize_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::loader::from_yaml_str;
    use crate::sql::Dialect;

    fn orders_model() -> SemanticModel {
        from_yaml_str(
            r#"
dataObjects:
  Customers:
    label: Customers
    code: CUSTOMERS
    database: WAREHOUSE
    schema: PUBLIC
    columns:
      Customer Id:
        label: Customer Id
        code: CUSTOMER_ID
        abstractType: int
      Country:
        label: Country
        code: COUNTRY
        abstractType: string
  Orders:
    label: Orders
    code: ORDERS
    database: WAREHOUSE
    schema: PUBLIC
    columns:
      Order Id:
        label: Order Id
        code: ORDER_ID
        abstractType: int
      Customer Id:
        label: Customer Id
        code: CUSTOMER_ID
        abstractType: int
      Ship Customer Id:
        label: Ship Customer Id
        code: SHIP_CUSTOMER_ID
        abstractType: int
    joins:
      - joinType: many-to-one
        joinTo: Customers
        columnsFrom: [Customer Id]
        columnsTo: [Customer Id]
      - joinType: many-to-one
        joinTo: Customers
        columnsFrom: [Ship Customer Id]
        columnsTo: [Customer Id]
        secondary: true
        pathName: ship
"#,
            "model.yaml",
        )
        .unwrap()
        .model
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_find_path_direct() {
        let model = orders_model();
        let graph = JoinGraph::new(&model, &[]);
        let steps = graph
            .find_join_path(&set(&["Orders"]), &set(&["Orders", "Customers"]))
            .unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].from_object, "Orders");
        assert_eq!(steps[0].to_object, "Customers");
        assert!(!steps[0].reversed);
        assert_eq!(steps[0].path_name, None);
    }

    #[test]
    fn test_find_path_reversed() {
        let model = orders_model();
        let graph = JoinGraph::new(&model, &[]);
        let steps = graph
            .find_join_path(&set(&["Customers"]), &set(&["Customers", "Orders"]))
            .unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].from_object, "Customers");
        assert_eq!(steps[0].to_object, "Orders");
        assert!(steps[0].reversed);
        assert_eq!(steps[0].cardinality, Cardinality::ManyToOne);
    }

    #[test]
    fn test_path_name_override() {
        let model = orders_model();
        let overrides = vec![UsePathName {
            source: "Orders".into(),
            target: "Customers".into(),
            path_name: "ship".into(),
        }];
        let graph = JoinGraph::new(&model, &overrides);
        let steps = graph
            .find_join_path(&set(&["Orders"]), &set(&["Orders", "Customers"]))
            .unwrap();
        assert_eq!(steps[0].from_columns, vec!["Ship Customer Id"]);
        assert_eq!(steps[0].path_name.as_deref(), Some("ship"));
    }

    #[test]
    fn test_on_condition_uses_physical_codes() {
        let model = orders_model();
        let graph = JoinGraph::new(&model, &[]);
        let steps = graph
            .find_join_path(&set(&["Orders"]), &set(&["Orders", "Customers"]))
            .unwrap();
        let on = graph.build_on_condition(&steps[0]);
        let sql = on
            .to_tokens_for_dialect(Dialect::Postgres)
            .serialize(Dialect::Postgres);
        assert_eq!(sql, "\"Orders\".\"CUSTOMER_ID\" = \"Customers\".\"CUSTOMER_ID\"");
    }

    #[test]
    fn test_no_path_is_skipped() {
        let model = from_yaml_str(
            r#"
dataObjects:
  A:
    label: A
    code: A
    database: D
    schema: S
  B:
    label: B
    code: B
    database: D
    schema: S
"#,
            "model.yaml",
        )
        .unwrap()
        .model;
        let graph = JoinGraph::new(&model, &[]);
        let steps = graph.find_join_path(&set(&["A"]), &set(&["A", "B"])).unwrap();
        assert!(steps.is_empty());
    }
}
