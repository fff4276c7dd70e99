// verity-core/src/infrastructure/config/project.rs

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::domain::project::configuration::ProjectConfig;
use crate::infrastructure::error::InfrastructureError;

/// Loads the project's main config file (`verity_project_conf.yaml` or
/// `verity.yaml`), then applies `VERITY_`-prefixed environment overrides.
#[instrument(skip(project_dir))]
pub fn load_project_config(project_dir: &Path) -> Result<ProjectConfig, InfrastructureError> {
    let config_path = find_main_config(project_dir)?;
    info!(path = ?config_path, "loading project manifest");

    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("failed to read project config at {:?}", config_path))?;
    let mut config: ProjectConfig = serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse project config YAML at {:?}", config_path))?;

    apply_env_overrides(&mut config);

    Ok(config)
}

fn find_main_config(root: &Path) -> Result<PathBuf, InfrastructureError> {
    let candidates = ["verity_project_conf.yaml", "verity.yaml"];
    for filename in candidates {
        let p = root.join(filename);
        if p.exists() {
            return Ok(p);
        }
    }
    Err(InfrastructureError::ConfigNotFound(format!(
        "no configuration file found in {:?}. checked: {:?}",
        root, candidates
    )))
}

/// `VERITY_TARGET_PATH` and `VERITY_PROFILE` override their YAML
/// counterparts so CI/CD and local dev can point a project at a
/// different build target or profile without editing the file.
fn apply_env_overrides(config: &mut ProjectConfig) {
    if let Ok(val) = std::env::var("VERITY_TARGET_PATH") {
        info!(old = ?config.target_path, new = ?val, "overriding target path via env");
        config.target_path = val;
    }
    if let Ok(val) = std::env::var("VERITY_PROFILE") {
        info!(old = ?config.profile, new = ?val, "overriding profile via env");
        config.profile = val;
    }
}
