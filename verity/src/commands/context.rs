// verity/src/commands/context.rs
//
// Shared setup every subcommand needs: load the project config, open the
// warehouse connection and the per-environment state store, and build a
// manifest loader. Kept in one place so `run`/`plan`/`list`/`deps`/
// `validate` don't each re-derive the DuckDB file path or state directory.

use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use verity_core::domain::project::ProjectConfig;
use verity_core::infrastructure::adapters::duckdb::{DuckDbClient, PoolConfig};
use verity_core::infrastructure::compiler::discovery::GraphDiscovery;
use verity_core::infrastructure::config::{load_connections, load_project_config};
use verity_core::infrastructure::state::FileStateStore;

pub struct RunContext {
    pub config: ProjectConfig,
    pub client: DuckDbClient,
    pub state: FileStateStore,
    pub loader: GraphDiscovery,
}

pub fn build(project_dir: &Path) -> anyhow::Result<RunContext> {
    let config = load_project_config(project_dir)
        .with_context(|| format!("failed to load project config from {project_dir:?}"))?;

    let pool_config = resolve_pool_config(project_dir, &config);
    let client = DuckDbClient::new(pool_config.clone())
        .with_context(|| format!("failed to open warehouse at {}", pool_config.db_path))?;

    let state_dir = project_dir.join(&config.target_path).join(".state");
    let state = FileStateStore::open(&state_dir, &config.profile)
        .with_context(|| format!("failed to open state store at {state_dir:?}"))?;

    Ok(RunContext {
        config,
        client,
        state,
        loader: GraphDiscovery::new(),
    })
}

/// Builds the warehouse pool config from `profiles.yml` when one is
/// present, falling back to a `<profile>.duckdb` file next to the
/// project when it isn't (so a bare project with no connection profile
/// still runs).
fn resolve_pool_config(project_dir: &Path, config: &ProjectConfig) -> PoolConfig {
    if let Ok(profile) = load_connections(project_dir, config) {
        if let Some(output) = profile.active(&config.profile) {
            let db_path = output
                .path
                .clone()
                .unwrap_or_else(|| format!("{}.duckdb", config.profile));
            return PoolConfig {
                db_path: project_dir.join(db_path).to_string_lossy().into_owned(),
                pool_size: output.pool_size,
                max_retries: output.max_retries,
                retry_delay: Duration::from_secs_f64(output.retry_delay_secs),
                lazy_init: output.lazy_init,
            };
        }
    }

    PoolConfig {
        db_path: project_dir
            .join(format!("{}.duckdb", config.profile))
            .to_string_lossy()
            .into_owned(),
        ..PoolConfig::default()
    }
}
