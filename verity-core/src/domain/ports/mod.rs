// src/domain/ports/mod.rs

pub mod manifest;
pub mod schema;
pub mod state_store;

pub use manifest::ManifestLoader;
pub use schema::SchemaSource;
pub use state_store::{Fingerprint, StateStore};
