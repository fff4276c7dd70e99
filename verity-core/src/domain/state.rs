// verity-core/src/domain/state.rs
//
// Per-environment, per-model execution history and fingerprint, persisted
// by a `StateStore` adapter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// State tracked for a single model within one environment. The
/// `(file_hash, config_hash, dependencies)` triple is the fingerprint the
/// planner diffs against to decide whether a model needs to run.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ModelState {
    pub model_name: String,
    pub file_hash: String,
    #[serde(default)]
    pub config_hash: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,

    #[serde(default)]
    pub execution_count: u64,
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub failure_count: u64,

    pub last_executed: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,

    /// String-keyed bag for incremental-strategy bookkeeping, e.g.
    /// `last_processed_time`.
    #[serde(default)]
    pub incremental_state: HashMap<String, Value>,
}

impl ModelState {
    pub fn new(model_name: impl Into<String>, file_hash: impl Into<String>) -> Self {
        ModelState {
            model_name: model_name.into(),
            file_hash: file_hash.into(),
            config_hash: None,
            dependencies: Vec::new(),
            execution_count: 0,
            success_count: 0,
            failure_count: 0,
            last_executed: None,
            last_success: None,
            last_failure: None,
            incremental_state: HashMap::new(),
        }
    }

    pub fn mark_execution(&mut self, success: bool, now: DateTime<Utc>) {
        self.last_executed = Some(now);
        self.execution_count += 1;
        if success {
            self.last_success = Some(now);
            self.success_count += 1;
        } else {
            self.last_failure = Some(now);
            self.failure_count += 1;
        }
    }

    pub fn get_incremental(&self, key: &str) -> Option<&Value> {
        self.incremental_state.get(key)
    }

    pub fn set_incremental(&mut self, key: impl Into<String>, value: Value) {
        self.incremental_state.insert(key.into(), value);
    }

    /// True if the stored fingerprint differs from the current one in any
    /// of file hash, config hash, or dependency set.
    pub fn changed_since(
        &self,
        file_hash: &str,
        config_hash: Option<&str>,
        dependencies: &[String],
    ) -> bool {
        if self.file_hash != file_hash {
            return true;
        }
        if let Some(ch) = config_hash {
            if self.config_hash.as_deref() != Some(ch) {
                return true;
            }
        }
        let mut current: Vec<&str> = dependencies.iter().map(String::as_str).collect();
        let mut stored: Vec<&str> = self.dependencies.iter().map(String::as_str).collect();
        current.sort_unstable();
        stored.sort_unstable();
        current != stored
    }
}
