// verity-core/src/infrastructure/config/schema.rs
//
// `ModelRegistry`: scans a project for `schema*.yml` files and resolves
// them into the `ModelConfig` map the graph/planner/materializer need.
// Each file may describe any number of models; later files win on name
// collision (last-scanned-wins, consistent with directory walk order).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::domain::error::DomainError;
use crate::domain::ports::schema::SchemaSource;
use crate::domain::project::model_config::{ColumnConfig, ModelConfig};

/// One `schema*.yml` file: a list of model declarations.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SchemaFile {
    #[serde(default)]
    pub models: Vec<ModelSchema>,
}

/// A single model's entry inside a `schema*.yml` file. `description` is
/// informational only; everything else maps onto `ModelConfig`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModelSchema {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub config: ModelConfig,
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
}

pub type ColumnSchema = ColumnConfig;

/// Discovers every `schema*.yml` under a project and merges their model
/// declarations into one `ModelConfig` table.
#[derive(Debug, Default)]
pub struct ModelRegistry;

impl ModelRegistry {
    pub fn new() -> Self {
        ModelRegistry
    }

    fn discover_schema_files(&self, project_root: &Path) -> Vec<std::path::PathBuf> {
        walkdir::WalkDir::new(project_root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .map(|name| {
                        name.starts_with("schema")
                            && (name.ends_with(".yml") || name.ends_with(".yaml"))
                    })
                    .unwrap_or(false)
            })
            .map(|e| e.path().to_path_buf())
            .collect()
    }
}

impl SchemaSource for ModelRegistry {
    fn load_configs(
        &self,
        project_root: &Path,
    ) -> Result<HashMap<String, ModelConfig>, DomainError> {
        let mut configs = HashMap::new();

        for path in self.discover_schema_files(project_root) {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| DomainError::SchemaError(format!("failed to read {:?}: {e}", path)))?;
            let file: SchemaFile = serde_yaml::from_str(&content)
                .map_err(|e| DomainError::SchemaError(format!("failed to parse {:?}: {e}", path)))?;

            for model in file.models {
                let mut config = model.config;
                if config.columns.is_empty() {
                    config.columns = model.columns;
                }
                config
                    .validate(&model.name)
                    .map_err(DomainError::SchemaError)?;
                configs.insert(model.name, config);
            }
        }

        Ok(configs)
    }
}
