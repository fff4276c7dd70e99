// verity-core/src/application/planner.rs
//
// `Planner`: a pure function of (parsed models, state store snapshot,
// target subset, full_refresh) -> `ExecutionPlan`. Never executes or
// mutates state itself. Grounded in the original `PlanGenerator`:
// subset expansion pulls in the requested models' transitive
// dependencies, each model is classified by comparing its current
// fingerprint against the stored one, and the plan's execution order
// only covers models that will actually run (create/update).

use std::collections::HashMap;

use crate::domain::error::DomainError;
use crate::domain::graph::dag::DependencyGraph;
use crate::domain::plan::{ChangeType, ExecutionPlan, ModelChange};
use crate::domain::ports::state_store::StateStore;
use crate::domain::project::manifest::ManifestNode;

pub struct Planner;

impl Planner {
    pub fn new() -> Self {
        Planner
    }

    /// Builds the plan for running `target` (or every model when `target`
    /// is empty) against `graph`, classifying each selected model by
    /// diffing its fingerprint against `state`.
    pub async fn generate_plan(
        &self,
        nodes: &HashMap<String, ManifestNode>,
        graph: &DependencyGraph,
        state: &dyn StateStore,
        target: &[String],
        full_refresh: bool,
    ) -> Result<ExecutionPlan, DomainError> {
        let mut selected: std::collections::BTreeSet<String> = if target.is_empty() {
            nodes.keys().cloned().collect()
        } else {
            let mut set = std::collections::BTreeSet::new();
            for name in target {
                set.insert(name.clone());
                set.extend(graph.all_dependencies(name));
            }
            set
        };
        selected.retain(|name| nodes.contains_key(name));

        let mut plan = ExecutionPlan::default();

        for name in &selected {
            let node = &nodes[name];
            let (change_type, reason) = if full_refresh {
                (ChangeType::Update, "full refresh requested".to_string())
            } else {
                self.classify(name, node, state).await?
            };

            let affected: Vec<String> = graph.dependents(name).into_iter().collect();

            plan.add_change(ModelChange {
                model_name: name.clone(),
                change_type,
                reason,
                affected,
            });
        }

        let models_to_execute = plan.models_to_execute();
        if !models_to_execute.is_empty() {
            plan.execution_order = graph.execution_order(&models_to_execute)?;
        }

        Ok(plan)
    }

    async fn classify(
        &self,
        name: &str,
        node: &ManifestNode,
        state: &dyn StateStore,
    ) -> Result<(ChangeType, String), DomainError> {
        let existing = state.get(name).await?;
        let Some(existing) = existing else {
            return Ok((ChangeType::Create, "new model".to_string()));
        };

        let file_hash = &node.parsed.content_hash;
        if existing.file_hash != *file_hash {
            return Ok((ChangeType::Update, "model file changed".to_string()));
        }

        let config_hash = node.config.content_hash();
        if existing.config_hash.as_deref() != Some(config_hash.as_str()) {
            return Ok((ChangeType::Update, "model configuration changed".to_string()));
        }

        let current_deps: std::collections::BTreeSet<&str> =
            node.parsed.refs.iter().map(String::as_str).collect();
        let stored_deps: std::collections::BTreeSet<&str> =
            existing.dependencies.iter().map(String::as_str).collect();
        if current_deps != stored_deps {
            return Ok((ChangeType::Update, "dependencies changed".to_string()));
        }

        Ok((ChangeType::NoChange, "no changes detected".to_string()))
    }
}

impl Default for Planner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::lineage::ModelLineage;
    use crate::domain::project::model_config::ModelConfig;
    use crate::domain::project::manifest::{ParsedModel, ResourceType};
    use crate::infrastructure::state::FileStateStore;
    use std::collections::BTreeSet;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn node(name: &str, refs: &[&str], hash: &str) -> ManifestNode {
        ManifestNode {
            name: name.to_string(),
            resource_type: ResourceType::Model,
            parsed: ParsedModel {
                name: name.to_string(),
                file_path: PathBuf::from(format!("models/{name}.sql")),
                raw_source: "select 1".into(),
                rendered_source: "select 1".into(),
                variables: BTreeSet::new(),
                refs: refs.iter().map(|s| s.to_string()).collect(),
                sources: BTreeSet::new(),
                config_overrides: Default::default(),
                static_depends_on: Vec::new(),
                lineage: ModelLineage::new(name),
                content_hash: hash.to_string(),
            },
            config: ModelConfig::default(),
        }
    }

    #[tokio::test]
    async fn new_model_is_classified_as_create() {
        let dir = tempdir().unwrap();
        let state = FileStateStore::open(dir.path(), "dev").unwrap();

        let mut nodes = HashMap::new();
        nodes.insert("orders".to_string(), node("orders", &[], "h1"));

        let mut graph = DependencyGraph::new();
        graph.add("orders".to_string(), vec![], None);

        let planner = Planner::new();
        let plan = planner
            .generate_plan(&nodes, &graph, &state, &[], false)
            .await
            .unwrap();

        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.changes[0].change_type, ChangeType::Create);
        assert_eq!(plan.execution_order, vec![vec!["orders".to_string()]]);
    }

    #[tokio::test]
    async fn unchanged_model_is_no_change_and_excluded_from_execution_order() {
        let dir = tempdir().unwrap();
        let state = FileStateStore::open(dir.path(), "dev").unwrap();
        let config_hash = ModelConfig::default().content_hash();
        state
            .update_fingerprint("orders", "h1", &[], Some(&config_hash))
            .await
            .unwrap();

        let mut nodes = HashMap::new();
        nodes.insert("orders".to_string(), node("orders", &[], "h1"));

        let mut graph = DependencyGraph::new();
        graph.add("orders".to_string(), vec![], None);

        let planner = Planner::new();
        let plan = planner
            .generate_plan(&nodes, &graph, &state, &[], false)
            .await
            .unwrap();

        assert_eq!(plan.changes[0].change_type, ChangeType::NoChange);
        assert!(plan.execution_order.is_empty());
    }

    #[tokio::test]
    async fn config_change_is_detected_even_when_file_and_dependencies_are_unchanged() {
        let dir = tempdir().unwrap();
        let state = FileStateStore::open(dir.path(), "dev").unwrap();
        let old_config_hash = ModelConfig::default().content_hash();
        state
            .update_fingerprint("orders", "h1", &[], Some(&old_config_hash))
            .await
            .unwrap();

        let mut changed = node("orders", &[], "h1");
        changed.config.materialized = crate::domain::project::model_config::MaterializationType::Table;

        let mut nodes = HashMap::new();
        nodes.insert("orders".to_string(), changed);

        let mut graph = DependencyGraph::new();
        graph.add("orders".to_string(), vec![], None);

        let planner = Planner::new();
        let plan = planner
            .generate_plan(&nodes, &graph, &state, &[], false)
            .await
            .unwrap();

        assert_eq!(plan.changes[0].change_type, ChangeType::Update);
        assert_eq!(plan.changes[0].reason, "model configuration changed");
    }

    #[tokio::test]
    async fn full_refresh_forces_update_even_when_unchanged() {
        let dir = tempdir().unwrap();
        let state = FileStateStore::open(dir.path(), "dev").unwrap();
        state
            .update_fingerprint("orders", "h1", &[], None)
            .await
            .unwrap();

        let mut nodes = HashMap::new();
        nodes.insert("orders".to_string(), node("orders", &[], "h1"));
        let mut graph = DependencyGraph::new();
        graph.add("orders".to_string(), vec![], None);

        let planner = Planner::new();
        let plan = planner
            .generate_plan(&nodes, &graph, &state, &[], true)
            .await
            .unwrap();

        assert_eq!(plan.changes[0].change_type, ChangeType::Update);
    }

    #[tokio::test]
    async fn target_subset_pulls_in_transitive_dependencies() {
        let dir = tempdir().unwrap();
        let state = FileStateStore::open(dir.path(), "dev").unwrap();

        let mut nodes = HashMap::new();
        nodes.insert("stg_orders".to_string(), node("stg_orders", &[], "h1"));
        nodes.insert("revenue".to_string(), node("revenue", &["stg_orders"], "h2"));

        let mut graph = DependencyGraph::new();
        graph.add("stg_orders".to_string(), vec![], None);
        graph.add("revenue".to_string(), vec!["stg_orders".to_string()], None);

        let planner = Planner::new();
        let plan = planner
            .generate_plan(&nodes, &graph, &state, &["revenue".to_string()], false)
            .await
            .unwrap();

        let names: BTreeSet<String> = plan.changes.iter().map(|c| c.model_name.clone()).collect();
        assert!(names.contains("stg_orders"));
        assert!(names.contains("revenue"));
    }
}
