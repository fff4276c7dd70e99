pub mod connection;
pub mod project;
pub mod schema;
pub mod source;

pub use crate::domain::project::ProjectConfig;
pub use connection::{ConnectionOutput, ConnectionProfile, load_connections};
pub use project::load_project_config;
pub use schema::{ColumnSchema, ModelRegistry, ModelSchema, SchemaFile};
pub use source::{SourceEntry, SourceList, load_sources};
