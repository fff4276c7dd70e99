// verity-core/src/infrastructure/state/file_store.rs
//
// `FileStateStore`: one JSON file per environment
// (`<state_dir>/<env>/state_<env>.json`), written atomically, with an
// in-process `tokio::sync::Mutex` serializing every mutation so two
// concurrent model executions never interleave a read-modify-write.
// Grounded in the original `StateManager` (`_load_state`/`_save_state`
// with a `.tmp` suffix + rename, one lock guarding all mutation) and the
// teacher's `infrastructure/fs.rs::atomic_write` for the rename mechanics.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::domain::error::DomainError;
use crate::domain::ports::state_store::{Fingerprint, StateStore};
use crate::domain::state::ModelState;
use crate::infrastructure::fs::atomic_write;

#[derive(Debug, Serialize, Deserialize, Default)]
struct StateFile {
    models: HashMap<String, ModelState>,
}

/// Per-environment JSON-file-backed `StateStore`. Scoping is
/// environment-only (no project namespacing), matching the original.
pub struct FileStateStore {
    path: PathBuf,
    state: Mutex<StateFile>,
}

impl FileStateStore {
    /// Opens (or creates) the state file for `environment` under
    /// `state_dir` (typically `<target_path>/.state`).
    pub fn open(state_dir: &Path, environment: &str) -> Result<Self, DomainError> {
        let env_dir = state_dir.join(environment);
        std::fs::create_dir_all(&env_dir)
            .map_err(|e| DomainError::ManifestError(format!("failed to create state dir: {e}")))?;
        let path = env_dir.join(format!("state_{environment}.json"));

        let state = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| DomainError::ManifestError(format!("failed to read state file: {e}")))?;
            serde_json::from_str(&content)
                .map_err(|e| DomainError::ManifestError(format!("failed to parse state file: {e}")))?
        } else {
            StateFile::default()
        };

        Ok(FileStateStore {
            path,
            state: Mutex::new(state),
        })
    }

    async fn persist(&self, state: &StateFile) -> Result<(), DomainError> {
        let content = serde_json::to_string_pretty(state)
            .map_err(|e| DomainError::ManifestError(format!("failed to serialize state: {e}")))?;
        atomic_write(&self.path, content)
            .map_err(|e| DomainError::ManifestError(format!("failed to write state file: {e}")))
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get(&self, model_name: &str) -> Result<Option<ModelState>, DomainError> {
        let state = self.state.lock().await;
        Ok(state.models.get(model_name).cloned())
    }

    async fn update_fingerprint(
        &self,
        model_name: &str,
        file_hash: &str,
        dependencies: &[String],
        config_hash: Option<&str>,
    ) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        let entry = state
            .models
            .entry(model_name.to_string())
            .or_insert_with(|| ModelState::new(model_name, file_hash));
        entry.file_hash = file_hash.to_string();
        entry.config_hash = config_hash.map(|s| s.to_string());
        entry.dependencies = dependencies.to_vec();
        self.persist(&state).await
    }

    async fn mark_execution(&self, model_name: &str, success: bool) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        let entry = state
            .models
            .entry(model_name.to_string())
            .or_insert_with(|| ModelState::new(model_name, ""));
        entry.mark_execution(success, chrono::Utc::now());
        self.persist(&state).await
    }

    async fn changed_since(
        &self,
        model_name: &str,
        file_hash: &str,
        config_hash: Option<&str>,
    ) -> Result<bool, DomainError> {
        let state = self.state.lock().await;
        Ok(match state.models.get(model_name) {
            Some(existing) => existing.changed_since(file_hash, config_hash, &existing.dependencies),
            None => true,
        })
    }

    async fn incremental_get(
        &self,
        model_name: &str,
        key: &str,
    ) -> Result<Option<Value>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .models
            .get(model_name)
            .and_then(|m| m.get_incremental(key))
            .cloned())
    }

    async fn incremental_set(
        &self,
        model_name: &str,
        key: &str,
        value: Value,
    ) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        let entry = state
            .models
            .entry(model_name.to_string())
            .or_insert_with(|| ModelState::new(model_name, ""));
        entry.set_incremental(key, value);
        self.persist(&state).await
    }

    async fn changed_models(
        &self,
        current: &HashMap<String, Fingerprint>,
    ) -> Result<HashSet<String>, DomainError> {
        let state = self.state.lock().await;
        let mut changed = HashSet::new();
        for (name, fp) in current {
            let is_changed = match state.models.get(name) {
                Some(existing) => {
                    existing.changed_since(&fp.file_hash, fp.config_hash.as_deref(), &fp.dependencies)
                }
                None => true,
            };
            if is_changed {
                changed.insert(name.clone());
            }
        }
        Ok(changed)
    }

    async fn clear(&self, model_name: Option<&str>) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        match model_name {
            Some(name) => {
                state.models.remove(name);
            }
            None => state.models.clear(),
        }
        self.persist(&state).await
    }

    async fn export(&self) -> Result<Vec<ModelState>, DomainError> {
        let state = self.state.lock().await;
        Ok(state.models.values().cloned().collect())
    }

    async fn import(&self, states: Vec<ModelState>) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        for model_state in states {
            state.models.insert(model_state.model_name.clone(), model_state);
        }
        self.persist(&state).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn fingerprint_roundtrips_and_detects_drift() {
        let dir = tempdir().unwrap();
        let store = FileStateStore::open(dir.path(), "dev").unwrap();

        store
            .update_fingerprint("orders", "h1", &["stg_orders".to_string()], None)
            .await
            .unwrap();

        assert!(!store.changed_since("orders", "h1", None).await.unwrap());
        assert!(store.changed_since("orders", "h2", None).await.unwrap());
        assert!(store.changed_since("unknown_model", "h1", None).await.unwrap());
    }

    #[tokio::test]
    async fn state_persists_across_store_instances() {
        let dir = tempdir().unwrap();
        {
            let store = FileStateStore::open(dir.path(), "dev").unwrap();
            store.mark_execution("orders", true).await.unwrap();
        }

        let reopened = FileStateStore::open(dir.path(), "dev").unwrap();
        let state = reopened.get("orders").await.unwrap().expect("state present");
        assert_eq!(state.success_count, 1);
    }

    #[tokio::test]
    async fn incremental_state_roundtrips() {
        let dir = tempdir().unwrap();
        let store = FileStateStore::open(dir.path(), "dev").unwrap();

        store
            .incremental_set("orders", "last_processed_time", Value::String("2026-01-01".into()))
            .await
            .unwrap();

        let value = store.incremental_get("orders", "last_processed_time").await.unwrap();
        assert_eq!(value, Some(Value::String("2026-01-01".into())));
    }

    #[tokio::test]
    async fn clear_removes_a_single_model_without_touching_others() {
        let dir = tempdir().unwrap();
        let store = FileStateStore::open(dir.path(), "dev").unwrap();
        store.mark_execution("orders", true).await.unwrap();
        store.mark_execution("customers", true).await.unwrap();

        store.clear(Some("orders")).await.unwrap();

        assert!(store.get("orders").await.unwrap().is_none());
        assert!(store.get("customers").await.unwrap().is_some());
    }
}
