// verity-core/src/domain/project/model_config.rs
//
// The metadata half of a model, sourced from `schema*.yml` files rather
// than the SQL file itself (see `ParsedModel` for the other half).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MaterializationType {
    #[default]
    View,
    Table,
    TempTable,
    Incremental,
    Cdc,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IncrementalStrategy {
    Time,
    UniqueKey,
    Append,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CdcMeta {
    #[serde(default = "default_change_type_column")]
    pub change_type_column: String,
}

impl Default for CdcMeta {
    fn default() -> Self {
        CdcMeta {
            change_type_column: default_change_type_column(),
        }
    }
}

fn default_change_type_column() -> String {
    "__CDC_OPERATION".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ModelMeta {
    #[serde(default)]
    pub cdc: CdcMeta,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ColumnConfig {
    pub name: String,
    #[serde(default)]
    pub tests: Vec<String>,
}

/// Per-model configuration as declared in a `schema*.yml` file, resolved
/// against project-level layer defaults by the registry that loads it.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default)]
    pub materialized: MaterializationType,

    #[serde(default)]
    pub incremental_strategy: Option<IncrementalStrategy>,

    #[serde(default)]
    pub time_column: Option<String>,

    #[serde(default)]
    pub unique_key: Option<String>,

    #[serde(default)]
    pub meta: ModelMeta,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub depends_on: Vec<String>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub tests: Vec<String>,

    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
}

fn default_enabled() -> bool {
    true
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            materialized: MaterializationType::default(),
            incremental_strategy: None,
            time_column: None,
            unique_key: None,
            meta: ModelMeta::default(),
            tags: Vec::new(),
            depends_on: Vec::new(),
            enabled: true,
            tests: Vec::new(),
            columns: Vec::new(),
        }
    }
}

impl ModelConfig {
    /// Checks the invariants required of incremental/CDC configs: the
    /// `time` strategy requires `time_column`; the `unique_key` strategy
    /// or `cdc` materialization requires `unique_key`.
    pub fn validate(&self, model_name: &str) -> Result<(), String> {
        if self.materialized == MaterializationType::Incremental {
            match self.incremental_strategy {
                Some(IncrementalStrategy::Time) if self.time_column.is_none() => {
                    return Err(format!(
                        "model '{model_name}': incremental strategy 'time' requires 'time_column'"
                    ));
                }
                Some(IncrementalStrategy::UniqueKey) if self.unique_key.is_none() => {
                    return Err(format!(
                        "model '{model_name}': incremental strategy 'unique_key' requires 'unique_key'"
                    ));
                }
                None => {
                    return Err(format!(
                        "model '{model_name}': materialized=incremental requires incremental_strategy"
                    ));
                }
                _ => {}
            }
        }

        if self.materialized == MaterializationType::Cdc && self.unique_key.is_none() {
            return Err(format!(
                "model '{model_name}': materialized=cdc requires 'unique_key'"
            ));
        }

        Ok(())
    }

    pub fn change_type_column(&self) -> &str {
        &self.meta.cdc.change_type_column
    }

    /// Stable hash of this config, used to detect a config-only change
    /// (the model file and its dependencies are unchanged, but the
    /// materialization settings are) independent of field order.
    pub fn content_hash(&self) -> String {
        let serialized = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(serialized.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Applies a model's `-- config: k=v,...` header overrides on top of
    /// the schema-file-sourced config. Header overrides win on conflict,
    /// matching a model file being the more specific, closer-to-the-code
    /// source of truth.
    pub fn with_overrides(&self, overrides: &HashMap<String, String>) -> ModelConfig {
        let mut config = self.clone();

        if let Some(materialized) = overrides.get("materialized") {
            if let Some(parsed) = MaterializationType::from_str(materialized) {
                config.materialized = parsed;
            }
        }
        if let Some(strategy) = overrides.get("incremental_strategy") {
            config.incremental_strategy = IncrementalStrategy::from_str(strategy);
        }
        if let Some(unique_key) = overrides.get("unique_key") {
            config.unique_key = Some(unique_key.clone());
        }
        if let Some(time_column) = overrides.get("time_column") {
            config.time_column = Some(time_column.clone());
        }

        config
    }
}

impl MaterializationType {
    fn from_str(value: &str) -> Option<Self> {
        match value {
            "view" => Some(MaterializationType::View),
            "table" => Some(MaterializationType::Table),
            "temp_table" | "temptable" => Some(MaterializationType::TempTable),
            "incremental" => Some(MaterializationType::Incremental),
            "cdc" => Some(MaterializationType::Cdc),
            _ => None,
        }
    }
}

impl IncrementalStrategy {
    fn from_str(value: &str) -> Option<Self> {
        match value {
            "time" => Some(IncrementalStrategy::Time),
            "unique_key" => Some(IncrementalStrategy::UniqueKey),
            "append" => Some(IncrementalStrategy::Append),
            _ => None,
        }
    }
}

pub type ConfigOverrides = HashMap<String, String>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_overrides_win_over_schema_config() {
        let base = ModelConfig {
            materialized: MaterializationType::View,
            ..Default::default()
        };
        let mut overrides = HashMap::new();
        overrides.insert("materialized".to_string(), "table".to_string());
        overrides.insert("unique_key".to_string(), "order_id".to_string());

        let merged = base.with_overrides(&overrides);
        assert_eq!(merged.materialized, MaterializationType::Table);
        assert_eq!(merged.unique_key.as_deref(), Some("order_id"));
    }

    #[test]
    fn unknown_override_values_are_ignored() {
        let base = ModelConfig::default();
        let mut overrides = HashMap::new();
        overrides.insert("materialized".to_string(), "bogus".to_string());

        let merged = base.with_overrides(&overrides);
        assert_eq!(merged.materialized, MaterializationType::View);
    }
}
