// verity-core/src/application/pipeline.rs
//
// `run_pipeline`: wires discovery, planning, materialization and
// validation into one run, executing each dependency level concurrently
// up to `max_parallelism` and cancelling remaining levels when
// `fail_fast` is set and a model fails.

use std::collections::HashMap;
use std::path::Path;

use futures::stream::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::materialization::{value_to_sql_scalar, Materializer};
use crate::application::planner::Planner;
use crate::application::validation;
use crate::domain::compiler::quoter::UniversalQuoter;
use crate::domain::graph::dag::DependencyGraph;
use crate::domain::plan::ExecutionPlan;
use crate::domain::ports::state_store::StateStore;
use crate::domain::ports::ManifestLoader;
use crate::domain::project::manifest::{Manifest, ManifestNode};
use crate::domain::project::ProjectConfig;
use crate::error::VerityError;
use crate::infrastructure::compiler::jinja::{ref_placeholder, source_placeholder, THIS_PLACEHOLDER};
use crate::ports::warehouse::WarehouseClient;

/// What to run and how.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Empty means "every model".
    pub target: Vec<String>,
    pub full_refresh: bool,
    /// `$variable` substitution values. Each is rendered as a typed SQL
    /// literal (quoted string, bare number, `TRUE`/`FALSE`, or `NULL`),
    /// not bound as a query parameter.
    pub variables: HashMap<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RunResult {
    pub executed: Vec<String>,
    pub skipped: Vec<String>,
    pub errors: Vec<(String, String)>,
}

impl RunResult {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Discovers the manifest, generates a plan, and executes it level by
/// level. Each execution level runs its models concurrently, capped at
/// `config.max_parallelism`. When `config.fail_fast` is set, an error
/// cancels the rest of the current level and stops before the next one.
pub async fn run_pipeline(
    manifest_loader: &dyn ManifestLoader,
    project_dir: &Path,
    config: &ProjectConfig,
    client: &dyn WarehouseClient,
    state: &dyn StateStore,
    options: &RunOptions,
) -> Result<(ExecutionPlan, RunResult), VerityError> {
    let manifest = manifest_loader
        .load(project_dir, config)
        .map_err(VerityError::Domain)?;

    let graph = DependencyGraph::from_manifest(&manifest);
    let planner = Planner::new();
    let plan = planner
        .generate_plan(
            &manifest.nodes,
            &graph,
            state,
            &options.target,
            options.full_refresh,
        )
        .await
        .map_err(VerityError::Domain)?;

    let models_to_execute: std::collections::HashSet<String> =
        plan.models_to_execute().into_iter().collect();

    let mut result = RunResult::default();
    let cancellation = CancellationToken::new();

    for level in &plan.execution_order {
        if cancellation.is_cancelled() {
            result.skipped.extend(level.iter().cloned());
            continue;
        }

        let runnable: Vec<&String> = level
            .iter()
            .filter(|name| models_to_execute.contains(*name))
            .collect();

        let futures = runnable.into_iter().map(|name| {
            let node = &manifest.nodes[name];
            let cancellation = cancellation.clone();
            async move {
                if cancellation.is_cancelled() {
                    return (
                        name.clone(),
                        Err(VerityError::InternalError(
                            "run cancelled after an earlier failure".to_string(),
                        )),
                    );
                }
                let outcome = execute_model(node, &manifest, client, state, &options.variables).await;
                (name.clone(), outcome)
            }
        });

        let mut stream = futures::stream::iter(futures).buffer_unordered(config.max_parallelism.max(1));

        while let Some((name, outcome)) = stream.next().await {
            match outcome {
                Ok(()) => {
                    info!(model = name, "model executed successfully");
                    let _ = state.mark_execution(&name, true).await;
                    result.executed.push(name);
                }
                Err(e) => {
                    error!(model = name, error = %e, "model execution failed");
                    let _ = state.mark_execution(&name, false).await;
                    result.errors.push((name, e.to_string()));
                    if config.fail_fast {
                        cancellation.cancel();
                    }
                }
            }
        }

        if config.fail_fast && !result.errors.is_empty() {
            break;
        }
    }

    Ok((plan, result))
}

async fn execute_model(
    node: &ManifestNode,
    manifest: &Manifest,
    client: &dyn WarehouseClient,
    state: &dyn StateStore,
    variables: &HashMap<String, Value>,
) -> Result<(), VerityError> {
    debug!(model = node.name, "composing select statement");

    let select_sql = compose_select_sql(node, manifest, variables)?;

    Materializer::materialize(client, state, &node.name, &select_sql, &node.config).await?;

    let report = validation::run_tests(node, client).await?;
    if !report.undocumented_columns.is_empty() {
        warn!(
            model = node.name,
            columns = ?report.undocumented_columns,
            "model has undocumented columns"
        );
    }

    let dependencies: Vec<String> = node.parsed.refs.iter().cloned().collect();
    let config_hash = node.config.content_hash();
    state
        .update_fingerprint(
            &node.name,
            &node.parsed.content_hash,
            &dependencies,
            Some(&config_hash),
        )
        .await?;

    Ok(())
}

/// Composes the text a strategy actually executes: substitute
/// `$variables` with typed SQL literals, then resolve
/// `__REF_`/`__SOURCE_`/`__THIS__` placeholders to fully-qualified names,
/// then quote every identifier.
fn compose_select_sql(
    node: &ManifestNode,
    manifest: &Manifest,
    variables: &HashMap<String, Value>,
) -> Result<String, VerityError> {
    let sql = substitute_variables(&node.parsed.rendered_source, &node.parsed.variables, variables);
    let sql = resolve_placeholders(&sql, node, manifest);

    UniversalQuoter::quote_identifiers(&sql)
        .map_err(|e| VerityError::InternalError(format!("failed to quote identifiers: {e}")))
}

/// Replaces each declared `$name` with a typed SQL literal: strings
/// single-quoted with embedded quotes doubled, numbers bare, booleans as
/// `TRUE`/`FALSE`, and `NULL` for a name with no bound value.
fn substitute_variables(
    sql: &str,
    declared: &std::collections::BTreeSet<String>,
    variables: &HashMap<String, Value>,
) -> String {
    let mut sql = sql.to_string();
    for name in declared {
        let literal = variables
            .get(name)
            .map(value_to_sql_scalar)
            .unwrap_or_else(|| "NULL".to_string());
        sql = sql.replace(&format!("${name}"), &literal);
    }
    sql
}

fn resolve_placeholders(sql: &str, node: &ManifestNode, manifest: &Manifest) -> String {
    let mut sql = sql.to_string();

    for dep in &node.parsed.refs {
        sql = sql.replace(&ref_placeholder(dep), dep);
    }

    for (src, tbl) in &node.parsed.sources {
        let resolved = manifest
            .sources
            .get(src)
            .and_then(|def| def.tables.get(tbl))
            .cloned()
            .unwrap_or_else(|| tbl.clone());
        sql = sql.replace(&source_placeholder(src, tbl), &resolved);
    }

    sql.replace(THIS_PLACEHOLDER, &node.name)
}
