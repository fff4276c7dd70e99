// verity/src/commands/deps.rs

use std::path::Path;

use anyhow::Context as _;
use verity_core::domain::graph::dag::DependencyGraph;
use verity_core::domain::ports::ManifestLoader;

use crate::cli::DepsFormat;

use super::context;

pub async fn execute(project_dir: &Path, format: DepsFormat) -> anyhow::Result<()> {
    let ctx = context::build(project_dir)?;

    let manifest = ctx
        .loader
        .load(project_dir, &ctx.config)
        .context("failed to load project manifest")?;

    let graph = DependencyGraph::from_manifest(&manifest);

    let mut names: Vec<&String> = manifest.nodes.keys().collect();
    names.sort();

    match format {
        DepsFormat::Text => {
            for name in names {
                let deps = graph.dependencies(name);
                if deps.is_empty() {
                    println!("{name}");
                } else {
                    println!("{name} -> {}", deps.into_iter().collect::<Vec<_>>().join(", "));
                }
            }
        }
        DepsFormat::Graphviz => {
            println!("digraph verity {{");
            for name in &names {
                println!("  \"{name}\";");
            }
            for name in &names {
                for dep in graph.dependencies(name) {
                    println!("  \"{dep}\" -> \"{name}\";");
                }
            }
            println!("}}");
        }
    }

    Ok(())
}
