// verity-core/src/domain/project/manifest.rs

use crate::domain::lineage::ModelLineage;
use crate::domain::project::model_config::{ConfigOverrides, ModelConfig};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

/// Everything the SQL parser produces for a single model, before any
/// YAML-sourced configuration is merged in. `refs` never contains the
/// model's own name; `refs` and `sources` are disjoint by construction
/// (one records model names, the other `(source, table)` pairs).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ParsedModel {
    pub name: String,
    pub file_path: PathBuf,
    pub raw_source: String,
    pub rendered_source: String,

    #[serde(default)]
    pub variables: BTreeSet<String>,
    #[serde(default)]
    pub refs: BTreeSet<String>,
    #[serde(default)]
    pub sources: BTreeSet<(String, String)>,
    #[serde(default)]
    pub config_overrides: ConfigOverrides,
    #[serde(default)]
    pub static_depends_on: Vec<String>,

    pub lineage: ModelLineage,
    pub content_hash: String,
}

/// The complete project manifest: every parsed model joined with its
/// resolved configuration, plus the project's declared sources.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Manifest {
    pub project_name: String,
    pub nodes: HashMap<String, ManifestNode>,
    #[serde(default)]
    pub sources: HashMap<String, SourceDefinition>,
}

/// An externally-managed table declared in `sources.yml`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SourceDefinition {
    pub name: String,
    pub database: String,
    pub schema: String,
    pub tables: HashMap<String, String>,
}

/// A single node in the execution graph: a `ParsedModel` merged with its
/// `ModelConfig`. Kept as one struct because every consumer downstream of
/// parsing (the graph, the planner, the materializer) needs both halves
/// together.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ManifestNode {
    pub name: String,
    pub resource_type: ResourceType,
    pub parsed: ParsedModel,
    pub config: ModelConfig,
}

impl ManifestNode {
    pub fn refs(&self) -> &BTreeSet<String> {
        &self.parsed.refs
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Model,
    Source,
    Analysis,
    Test,
}
