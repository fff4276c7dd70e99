// verity-core/src/infrastructure/config/source.rs
//
// Loads `sources.yml`: the project's declared warehouse tables that no
// model produces, referenced from SQL via `source('name', 'table')`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::domain::project::SourceDefinition;
use crate::infrastructure::error::InfrastructureError;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SourceList {
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SourceEntry {
    pub name: String,
    pub database: String,
    pub schema: String,
    #[serde(default)]
    pub tables: Vec<SourceTable>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SourceTable {
    pub name: String,
    #[serde(default)]
    pub identifier: Option<String>,
}

const CANDIDATE_FILENAMES: [&str; 2] = ["sources.yml", "sources.yaml"];

/// Reads `sources.yml`/`sources.yaml` from a project root, if present,
/// and returns one `SourceDefinition` per declared source. A project
/// with no sources file simply has no sources — this is not an error.
pub fn load_sources(
    project_root: &Path,
) -> Result<HashMap<String, SourceDefinition>, InfrastructureError> {
    let mut result = HashMap::new();

    let path = CANDIDATE_FILENAMES
        .iter()
        .map(|f| project_root.join(f))
        .find(|p| p.exists());

    let Some(path) = path else {
        return Ok(result);
    };

    let content = std::fs::read_to_string(&path)?;
    let parsed: SourceList = serde_yaml::from_str(&content)?;

    for entry in parsed.sources {
        let tables = entry
            .tables
            .into_iter()
            .map(|t| {
                let identifier = t.identifier.clone().unwrap_or_else(|| t.name.clone());
                (t.name, identifier)
            })
            .collect();

        result.insert(
            entry.name.clone(),
            SourceDefinition {
                name: entry.name,
                database: entry.database,
                schema: entry.schema,
                tables,
            },
        );
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn loads_sources_with_explicit_identifier() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("sources.yml"),
            r#"
sources:
  - name: raw
    database: analytics
    schema: raw
    tables:
      - name: orders
        identifier: RAW_ORDERS
"#,
        )
        .unwrap();

        let sources = load_sources(dir.path()).unwrap();
        let raw = sources.get("raw").unwrap();
        assert_eq!(raw.tables.get("orders").unwrap(), "RAW_ORDERS");
    }

    #[test]
    fn identifier_defaults_to_table_name() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("sources.yml"),
            "sources:\n  - name: raw\n    database: analytics\n    schema: raw\n    tables:\n      - name: orders\n",
        )
        .unwrap();

        let sources = load_sources(dir.path()).unwrap();
        assert_eq!(sources["raw"].tables["orders"], "orders");
    }

    #[test]
    fn missing_sources_file_is_not_an_error() {
        let dir = tempdir().unwrap();
        let sources = load_sources(dir.path()).unwrap();
        assert!(sources.is_empty());
    }
}
