use crate::domain::error::DomainError;
use crate::domain::project::ModelConfig;
use std::collections::HashMap;
use std::path::Path;

/// Source of per-model configuration (the `ModelRegistry`'s contract):
/// scans a project for `schema*.yml` files and returns the resolved
/// `ModelConfig` for every model name found.
pub trait SchemaSource: Send + Sync {
    fn load_configs(&self, project_root: &Path) -> Result<HashMap<String, ModelConfig>, DomainError>;
}
