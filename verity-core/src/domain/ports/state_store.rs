use crate::domain::error::DomainError;
use crate::domain::state::ModelState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// The triple a model is fingerprinted by for change detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fingerprint {
    pub file_hash: String,
    pub config_hash: Option<String>,
    pub dependencies: Vec<String>,
}

/// Per-environment, persistent fingerprint and execution-history store.
/// Implementations must serialize concurrent mutations and must never let
/// a reader observe a partially-written state file.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, model_name: &str) -> Result<Option<ModelState>, DomainError>;

    async fn update_fingerprint(
        &self,
        model_name: &str,
        file_hash: &str,
        dependencies: &[String],
        config_hash: Option<&str>,
    ) -> Result<(), DomainError>;

    async fn mark_execution(&self, model_name: &str, success: bool) -> Result<(), DomainError>;

    async fn changed_since(
        &self,
        model_name: &str,
        file_hash: &str,
        config_hash: Option<&str>,
    ) -> Result<bool, DomainError>;

    async fn incremental_get(
        &self,
        model_name: &str,
        key: &str,
    ) -> Result<Option<Value>, DomainError>;

    async fn incremental_set(
        &self,
        model_name: &str,
        key: &str,
        value: Value,
    ) -> Result<(), DomainError>;

    /// Model names whose stored fingerprint differs from `current`, given
    /// the fingerprints of every model presently in the codebase.
    async fn changed_models(
        &self,
        current: &HashMap<String, Fingerprint>,
    ) -> Result<HashSet<String>, DomainError>;

    async fn clear(&self, model_name: Option<&str>) -> Result<(), DomainError>;

    async fn export(&self) -> Result<Vec<ModelState>, DomainError>;

    async fn import(&self, states: Vec<ModelState>) -> Result<(), DomainError>;
}
