// verity-core/src/domain/project/configuration.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Warehouse engine backing the `WarehouseClient` boundary. DuckDB is the
/// only concrete driver; the enum exists so a project file can be explicit
/// about its target even though today there is one implementation.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[default]
    DuckDB,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProjectConfig {
    pub name: String,
    pub version: String,
    #[serde(default = "default_profile")]
    pub profile: String,

    #[serde(default)]
    pub engine: Engine,

    #[serde(rename = "config-paths", default)]
    pub config_paths: Vec<String>,

    #[serde(rename = "model-paths", default = "default_model_paths")]
    pub model_paths: Vec<String>,

    #[serde(rename = "target-path", default = "default_target_path")]
    pub target_path: String,

    #[serde(rename = "clean-targets", default = "default_clean_targets")]
    pub clean_targets: Vec<String>,

    /// Maximum number of models executed concurrently within one
    /// topological level.
    #[serde(default = "default_max_parallelism")]
    pub max_parallelism: usize,

    /// If true, an error in any model cancels queued peers at the next
    /// level barrier. Default false: failures are recorded per-model and
    /// do not abort the run.
    #[serde(default)]
    pub fail_fast: bool,

    #[serde(default)]
    pub defaults: HashMap<String, LayerConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LayerConfig {
    pub materialized: Option<String>,
    pub schema: Option<String>,
}

fn default_clean_targets() -> Vec<String> {
    vec!["target".to_string()]
}
fn default_target_path() -> String {
    "target".to_string()
}
fn default_profile() -> String {
    "dev".to_string()
}
fn default_model_paths() -> Vec<String> {
    vec!["models".to_string()]
}
fn default_max_parallelism() -> usize {
    8
}
