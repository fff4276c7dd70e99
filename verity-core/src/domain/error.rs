// verity-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised by the domain layer: graph construction, parsing, planning
/// and configuration validation. Infrastructure-specific failures (I/O,
/// warehouse errors, YAML decoding) live in `InfrastructureError` instead.
#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("configuration error: {0}")]
    #[diagnostic(code(verity::domain::configuration))]
    Configuration(String),

    #[error("failed to parse model '{model}': {reason}")]
    #[diagnostic(code(verity::domain::parse))]
    Parse { model: String, reason: String },

    #[error("circular dependency detected: {0}")]
    #[diagnostic(
        code(verity::domain::cycle),
        help("the listed path closes back on its first model; break the ref() chain")
    )]
    CircularDependency(String),

    #[error("unknown dependency '{0}'")]
    #[diagnostic(code(verity::domain::dependency))]
    UnknownDependency(String),

    #[error("model '{0}' not found in manifest")]
    #[diagnostic(code(verity::domain::model_not_found))]
    ModelNotFound(String),

    #[error("plan error: {0}")]
    #[diagnostic(code(verity::domain::plan))]
    Plan(String),

    #[error("data quality test failed for '{model}': {reason}")]
    #[diagnostic(code(verity::domain::test))]
    Test { model: String, reason: String },

    #[error("manifest loading error: {0}")]
    #[diagnostic(code(verity::domain::manifest))]
    ManifestError(String),

    #[error("schema error: {0}")]
    #[diagnostic(code(verity::domain::schema))]
    SchemaError(String),
}
