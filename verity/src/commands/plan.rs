// verity/src/commands/plan.rs

use std::path::Path;

use anyhow::Context as _;
use comfy_table::{ContentArrangement, Table};
use verity_core::application::Planner;
use verity_core::domain::graph::dag::DependencyGraph;
use verity_core::domain::ports::ManifestLoader;

use super::context;

pub async fn execute(
    project_dir: &Path,
    models: Vec<String>,
    full_refresh: bool,
    _vars: Vec<(String, String)>,
) -> anyhow::Result<()> {
    let ctx = context::build(project_dir)?;

    let manifest = ctx
        .loader
        .load(project_dir, &ctx.config)
        .context("failed to load project manifest")?;

    let graph = DependencyGraph::from_manifest(&manifest);
    let planner = Planner::new();
    let plan = planner
        .generate_plan(&manifest.nodes, &graph, &ctx.state, &models, full_refresh)
        .await
        .context("failed to generate plan")?;

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["model", "change", "reason"]);
    for change in &plan.changes {
        table.add_row(vec![
            change.model_name.clone(),
            format!("{:?}", change.change_type),
            change.reason.clone(),
        ]);
    }
    println!("{table}");

    let summary = plan.summary();
    println!(
        "{} models: {} to create, {} to update, {} unchanged, {} execution level(s)",
        summary.total_models,
        summary.creates,
        summary.updates,
        summary.no_changes,
        summary.execution_levels,
    );

    Ok(())
}
