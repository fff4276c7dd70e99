// verity/src/commands/validate.rs

use std::path::Path;

use anyhow::Context as _;
use verity_core::application::validation;
use verity_core::domain::ports::ManifestLoader;

use super::context;

pub async fn execute(project_dir: &Path) -> anyhow::Result<()> {
    let ctx = context::build(project_dir)?;

    let manifest = ctx
        .loader
        .load(project_dir, &ctx.config)
        .context("failed to load project manifest")?;

    let mut names: Vec<&String> = manifest.nodes.keys().collect();
    names.sort();

    let mut failures = Vec::new();
    let mut tests_run = 0;

    for name in names {
        let node = &manifest.nodes[name];
        if let Err(e) = node.config.validate(name) {
            failures.push(format!("{name}: {e}"));
            continue;
        }
        match validation::run_tests(node, &ctx.client).await {
            Ok(report) => tests_run += report.tests_run,
            Err(e) => failures.push(format!("{name}: {e}")),
        }
    }

    println!("{tests_run} test(s) run");
    for failure in &failures {
        eprintln!("error: {failure}");
    }

    if !failures.is_empty() {
        anyhow::bail!("{} model(s) failed validation", failures.len());
    }

    Ok(())
}
