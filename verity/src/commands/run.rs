// verity/src/commands/run.rs

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context as _;
use tracing::info;
use verity_core::application::{run_pipeline, RunOptions};

use super::{context, infer_var_value};

pub async fn execute(
    project_dir: &Path,
    models: Vec<String>,
    full_refresh: bool,
    vars: Vec<(String, String)>,
) -> anyhow::Result<()> {
    let ctx = context::build(project_dir)?;

    let options = RunOptions {
        target: models,
        full_refresh,
        variables: vars
            .into_iter()
            .map(|(k, v)| (k, infer_var_value(&v)))
            .collect::<HashMap<_, _>>(),
    };

    let (plan, result) = run_pipeline(
        &ctx.loader,
        project_dir,
        &ctx.config,
        &ctx.client,
        &ctx.state,
        &options,
    )
    .await
    .context("pipeline run failed")?;

    let summary = plan.summary();
    info!(
        creates = summary.creates,
        updates = summary.updates,
        no_changes = summary.no_changes,
        executed = result.executed.len(),
        failed = result.errors.len(),
        "run finished"
    );

    for (model, err) in &result.errors {
        eprintln!("error: {model}: {err}");
    }

    if !result.success() {
        anyhow::bail!("{} model(s) failed", result.errors.len());
    }

    Ok(())
}
