// verity/src/commands/list.rs

use std::path::Path;

use anyhow::Context as _;
use comfy_table::{ContentArrangement, Table};
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

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["model", "materialized", "tags"]);
    for name in names {
        let node = &manifest.nodes[name];
        table.add_row(vec![
            name.clone(),
            format!("{:?}", node.config.materialized),
            node.config.tags.join(", "),
        ]);
    }
    println!("{table}");
    println!("{} models", manifest.nodes.len());

    Ok(())
}
