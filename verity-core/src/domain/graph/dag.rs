// verity-core/src/domain/graph/dag.rs

use crate::domain::error::DomainError;
use crate::domain::lineage::ModelLineage;
use crate::domain::project::Manifest;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// The project's dependency graph: nodes are model names, edges run from a
/// model to the models it depends on (`ref()`). Cycle detection is a
/// separate DFS pass from the level-parallel Kahn sort that produces
/// execution order, so a cycle always comes back with a concrete path
/// rather than just a "processed count mismatch".
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    dependencies: HashMap<String, BTreeSet<String>>,
    dependents: HashMap<String, BTreeSet<String>>,
    lineage: HashMap<String, ModelLineage>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_manifest(manifest: &Manifest) -> Self {
        let mut graph = Self::new();
        for (name, node) in &manifest.nodes {
            let lineage = node.parsed.lineage.clone();
            graph.add(name.clone(), node.refs().iter().cloned().collect(), Some(lineage));
        }
        graph
    }

    pub fn add(&mut self, name: String, deps: Vec<String>, lineage: Option<ModelLineage>) {
        self.dependencies.entry(name.clone()).or_default();
        self.dependents.entry(name.clone()).or_default();

        for dep in &deps {
            self.dependents.entry(dep.clone()).or_default().insert(name.clone());
        }
        self.dependencies
            .entry(name.clone())
            .or_default()
            .extend(deps);

        if let Some(l) = lineage {
            self.lineage.insert(name.clone(), l);
        }
    }

    pub fn remove(&mut self, name: &str) {
        if let Some(deps) = self.dependencies.remove(name) {
            for dep in deps {
                if let Some(set) = self.dependents.get_mut(&dep) {
                    set.remove(name);
                }
            }
        }
        if let Some(dependents) = self.dependents.remove(name) {
            for dependent in dependents {
                if let Some(set) = self.dependencies.get_mut(&dependent) {
                    set.remove(name);
                }
            }
        }
        self.lineage.remove(name);
    }

    pub fn dependencies(&self, name: &str) -> BTreeSet<String> {
        self.dependencies.get(name).cloned().unwrap_or_default()
    }

    pub fn dependents(&self, name: &str) -> BTreeSet<String> {
        self.dependents.get(name).cloned().unwrap_or_default()
    }

    pub fn all_dependencies(&self, name: &str) -> BTreeSet<String> {
        self.transitive_closure(name, &self.dependencies)
    }

    pub fn all_dependents(&self, name: &str) -> BTreeSet<String> {
        self.transitive_closure(name, &self.dependents)
    }

    fn transitive_closure(
        &self,
        start: &str,
        edges: &HashMap<String, BTreeSet<String>>,
    ) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        queue.push_back(start.to_string());

        while let Some(current) = queue.pop_front() {
            if let Some(neighbors) = edges.get(&current) {
                for n in neighbors {
                    if seen.insert(n.clone()) {
                        queue.push_back(n.clone());
                    }
                }
            }
        }
        seen
    }

    /// DFS with an explicit recursion-stack set; returns the cycle path on
    /// the first back-edge found, in visitation order.
    pub fn detect_cycle(&self) -> Option<Vec<String>> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut stack: Vec<String> = Vec::new();
        let mut on_stack: HashSet<String> = HashSet::new();

        let mut names: Vec<&String> = self.dependencies.keys().collect();
        names.sort();

        for name in names {
            if !visited.contains(name) {
                if let Some(cycle) = self.dfs_visit(name, &mut visited, &mut stack, &mut on_stack) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn dfs_visit(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        stack: &mut Vec<String>,
        on_stack: &mut HashSet<String>,
    ) -> Option<Vec<String>> {
        visited.insert(node.to_string());
        stack.push(node.to_string());
        on_stack.insert(node.to_string());

        if let Some(deps) = self.dependencies.get(node) {
            for dep in deps {
                if on_stack.contains(dep) {
                    let start = stack.iter().position(|n| n == dep).unwrap_or(0);
                    let mut cycle: Vec<String> = stack[start..].to_vec();
                    cycle.push(dep.clone());
                    return Some(cycle);
                }
                if !visited.contains(dep) {
                    if let Some(cycle) = self.dfs_visit(dep, visited, stack, on_stack) {
                        return Some(cycle);
                    }
                }
            }
        }

        stack.pop();
        on_stack.remove(node);
        None
    }

    /// Level-parallel topological order over the whole graph. Each level
    /// contains every node whose remaining in-degree was zero at the start
    /// of that level.
    pub fn topological_order(&self) -> Result<Vec<Vec<String>>, DomainError> {
        let all: Vec<String> = self.dependencies.keys().cloned().collect();
        self.layered_order(&all)
    }

    /// Level-parallel order restricted to `subset` (and edges between
    /// members of the subset only).
    pub fn execution_order(&self, subset: &[String]) -> Result<Vec<Vec<String>>, DomainError> {
        self.layered_order(subset)
    }

    fn layered_order(&self, subset: &[String]) -> Result<Vec<Vec<String>>, DomainError> {
        if let Some(cycle) = self.detect_cycle() {
            return Err(DomainError::CircularDependency(cycle.join(" -> ")));
        }

        let members: HashSet<&str> = subset.iter().map(String::as_str).collect();
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        for name in &members {
            in_degree.insert(name, 0);
        }
        for name in &members {
            if let Some(deps) = self.dependencies.get(*name) {
                for dep in deps {
                    if members.contains(dep.as_str()) {
                        *in_degree.get_mut(name).expect("member present") += 1;
                    }
                }
            }
        }

        let mut queue: VecDeque<&str> = in_degree
            .iter()
            .filter(|(_, &d)| d == 0)
            .map(|(&n, _)| n)
            .collect();
        let mut queue_sorted: Vec<&str> = queue.drain(..).collect();
        queue_sorted.sort_unstable();
        let mut queue: VecDeque<&str> = queue_sorted.into();

        let mut levels: Vec<Vec<String>> = Vec::new();
        let mut resolved = 0usize;

        while !queue.is_empty() {
            let layer_size = queue.len();
            let mut layer: Vec<String> = Vec::new();

            for _ in 0..layer_size {
                let current = queue.pop_front().expect("non-empty");
                layer.push(current.to_string());
                resolved += 1;

                if let Some(dependents) = self.dependents.get(current) {
                    for dependent in dependents {
                        if !members.contains(dependent.as_str()) {
                            continue;
                        }
                        if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                            *degree -= 1;
                            if *degree == 0 {
                                queue.push_back(dependent.as_str());
                            }
                        }
                    }
                }
            }
            layer.sort_unstable();
            levels.push(layer);
        }

        if resolved != members.len() {
            return Err(DomainError::CircularDependency(
                "subset graph contains a cycle not reachable from a full scan".to_string(),
            ));
        }

        Ok(levels)
    }

    /// Transitive closure of `dependents` over a changed set: every model
    /// that could be affected by a change to any member of `changed`.
    pub fn impact(&self, changed: &HashSet<String>) -> BTreeSet<String> {
        let mut affected = BTreeSet::new();
        for name in changed {
            affected.extend(self.all_dependents(name));
        }
        affected
    }

    /// Downstream columns whose lineage references `(model, column)`,
    /// recursing through the chain of consumers.
    pub fn column_impact(&self, model: &str, column: &str) -> BTreeSet<String> {
        let mut affected = BTreeSet::new();
        let mut frontier: VecDeque<(String, String)> =
            VecDeque::from([(model.to_string(), column.to_string())]);
        let mut visited: HashSet<(String, String)> = HashSet::new();

        while let Some((cur_model, cur_col)) = frontier.pop_front() {
            if !visited.insert((cur_model.clone(), cur_col.clone())) {
                continue;
            }
            for dependent in self.dependents(&cur_model) {
                if let Some(lineage) = self.lineage.get(&dependent) {
                    for col_lineage in lineage.columns.values() {
                        if col_lineage
                            .source_columns
                            .iter()
                            .any(|(t, c)| t == &cur_model && c == &cur_col)
                        {
                            let label = format!("{dependent}.{}", col_lineage.column_name);
                            if affected.insert(label) {
                                frontier.push_back((dependent.clone(), col_lineage.column_name.clone()));
                            }
                        }
                    }
                }
            }
        }
        affected
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn graph_linear() -> DependencyGraph {
        let mut g = DependencyGraph::new();
        g.add("a".into(), vec![], None);
        g.add("b".into(), vec!["a".into()], None);
        g.add("c".into(), vec!["b".into()], None);
        g
    }

    #[test]
    fn topological_order_is_level_parallel() {
        let mut g = DependencyGraph::new();
        g.add("a".into(), vec![], None);
        g.add("b".into(), vec!["a".into()], None);
        g.add("c".into(), vec!["a".into()], None);
        g.add("d".into(), vec!["b".into(), "c".into()], None);

        let order = g.topological_order().unwrap();
        assert_eq!(order.len(), 3);
        assert_eq!(order[0], vec!["a".to_string()]);
        let mut middle = order[1].clone();
        middle.sort();
        assert_eq!(middle, vec!["b".to_string(), "c".to_string()]);
        assert_eq!(order[2], vec!["d".to_string()]);
    }

    #[test]
    fn linear_chain_orders_in_three_levels() {
        let g = graph_linear();
        let order = g.topological_order().unwrap();
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn detect_cycle_finds_a_concrete_path() {
        let mut g = DependencyGraph::new();
        g.add("a".into(), vec!["b".into()], None);
        g.add("b".into(), vec!["a".into()], None);

        let cycle = g.detect_cycle().expect("cycle expected");
        assert!(cycle.contains(&"a".to_string()));
        assert!(cycle.contains(&"b".to_string()));

        let result = g.topological_order();
        assert!(matches!(result, Err(DomainError::CircularDependency(_))));
    }

    #[test]
    fn impact_is_transitive_over_dependents() {
        let mut g = DependencyGraph::new();
        g.add("a".into(), vec![], None);
        g.add("b".into(), vec!["a".into()], None);
        g.add("c".into(), vec!["b".into()], None);

        let changed: HashSet<String> = ["a".to_string()].into_iter().collect();
        let affected = g.impact(&changed);
        assert!(affected.contains("b"));
        assert!(affected.contains("c"));
    }

    #[test]
    fn execution_order_respects_an_explicit_subset() {
        let g = graph_linear();
        let order = g
            .execution_order(&["a".to_string(), "b".to_string()])
            .unwrap();
        assert_eq!(order, vec![vec!["a".to_string()], vec!["b".to_string()]]);
    }
}
