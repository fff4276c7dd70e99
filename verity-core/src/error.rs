// verity-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerityError {
    // --- DOMAIN ERRORS (business rules, cycles, plan, config validation) ---
    #[error(transparent)]
    Domain(#[from] DomainError),

    // --- INFRASTRUCTURE ERRORS (I/O, parsing, warehouse, templating) ---
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),

    // --- GENERIC / APPLICATION-LEVEL ERRORS ---
    #[error("internal error: {0}")]
    InternalError(String),

    #[error("unsafe path traversal detected: {0}")]
    UnsafePath(String),
}

// Manual impl to avoid a duplicate enum variant while keeping `?` ergonomic.
impl From<std::io::Error> for VerityError {
    fn from(err: std::io::Error) -> Self {
        VerityError::Infrastructure(InfrastructureError::Io(err))
    }
}
