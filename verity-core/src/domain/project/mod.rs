// verity-core/src/domain/project/mod.rs

pub mod configuration;
pub mod manifest;
pub mod model_config;

pub use configuration::{Engine, LayerConfig, ProjectConfig};
pub use manifest::{Manifest, ManifestNode, ParsedModel, ResourceType, SourceDefinition};
pub use model_config::{
    CdcMeta, ColumnConfig, ConfigOverrides, IncrementalStrategy, MaterializationType, ModelConfig,
    ModelMeta,
};
