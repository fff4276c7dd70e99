// verity-core/src/application/validation.rs
//
// Runs the per-column data tests declared in a model's `schema*.yml`
// (`not_null`, `unique`) as SQL assertions against the materialized
// table/view. Undocumented columns are reported, not auto-written back
// to the schema file.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::domain::project::manifest::ManifestNode;
use crate::error::VerityError;
use crate::ports::warehouse::WarehouseClient;

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub tests_run: usize,
    pub undocumented_columns: Vec<String>,
}

pub async fn run_tests(
    node: &ManifestNode,
    client: &dyn WarehouseClient,
) -> Result<ValidationReport, VerityError> {
    let mut report = ValidationReport {
        undocumented_columns: detect_undocumented_columns(node, client).await?,
        ..Default::default()
    };

    if node.config.columns.is_empty() {
        return Ok(report);
    }

    info!(model = node.name, "running data tests");

    for column in &node.config.columns {
        for test in &column.tests {
            match test.as_str() {
                "not_null" => check_not_null(&node.name, &column.name, client).await?,
                "unique" => check_unique(&node.name, &column.name, client).await?,
                other => {
                    warn!(model = node.name, test = other, "unknown test type, skipping");
                    continue;
                }
            }
            report.tests_run += 1;
        }
    }

    Ok(report)
}

async fn detect_undocumented_columns(
    node: &ManifestNode,
    client: &dyn WarehouseClient,
) -> Result<Vec<String>, VerityError> {
    let actual_columns = client.fetch_columns(&node.name).await?;
    let actual: std::collections::HashSet<String> = actual_columns
        .into_iter()
        .map(|c| c.name.to_lowercase())
        .collect();
    let expected: std::collections::HashSet<String> = node
        .config
        .columns
        .iter()
        .map(|c| c.name.to_lowercase())
        .collect();

    let mut undocumented: Vec<String> = actual.difference(&expected).cloned().collect();
    undocumented.sort();

    if !undocumented.is_empty() {
        warn!(model = node.name, columns = ?undocumented, "undocumented columns detected");
    }

    Ok(undocumented)
}

async fn check_not_null(
    table: &str,
    column: &str,
    client: &dyn WarehouseClient,
) -> Result<(), VerityError> {
    let sql = format!(
        "SELECT CASE WHEN COUNT(*) > 0 THEN error('assertion failed: found NULL values in {table}.{column}') ELSE 0 END \
         FROM {table} WHERE {column} IS NULL"
    );
    client.execute(&sql, &HashMap::new(), false).await?;
    Ok(())
}

async fn check_unique(
    table: &str,
    column: &str,
    client: &dyn WarehouseClient,
) -> Result<(), VerityError> {
    let sql = format!(
        "SELECT CASE WHEN count(*) > 0 THEN error('assertion failed: found duplicates in {table}.{column}') ELSE 0 END \
         FROM (SELECT {column} FROM {table} GROUP BY {column} HAVING count(*) > 1)"
    );
    client.execute(&sql, &HashMap::new(), false).await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::lineage::ModelLineage;
    use crate::domain::project::manifest::{ParsedModel, ResourceType};
    use crate::domain::project::model_config::{ColumnConfig, ModelConfig};
    use crate::infrastructure::adapters::DuckDbClient;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn node_with_columns(name: &str, columns: Vec<ColumnConfig>) -> ManifestNode {
        ManifestNode {
            name: name.to_string(),
            resource_type: ResourceType::Model,
            parsed: ParsedModel {
                name: name.to_string(),
                file_path: PathBuf::from(format!("models/{name}.sql")),
                raw_source: "select 1".into(),
                rendered_source: "select 1".into(),
                variables: BTreeSet::new(),
                refs: BTreeSet::new(),
                sources: BTreeSet::new(),
                config_overrides: Default::default(),
                static_depends_on: Vec::new(),
                lineage: ModelLineage::new(name),
                content_hash: "deadbeef".into(),
            },
            config: ModelConfig {
                columns,
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn not_null_and_unique_pass_on_clean_data() {
        let client = DuckDbClient::in_memory().unwrap();
        client
            .execute(
                "CREATE TABLE users (id INTEGER, email VARCHAR)",
                &HashMap::new(),
                false,
            )
            .await
            .unwrap();
        client
            .execute(
                "INSERT INTO users VALUES (1, 'a@example.com'), (2, 'b@example.com')",
                &HashMap::new(),
                false,
            )
            .await
            .unwrap();

        let node = node_with_columns(
            "users",
            vec![ColumnConfig {
                name: "id".into(),
                tests: vec!["not_null".into(), "unique".into()],
            }],
        );

        let report = run_tests(&node, &client).await.unwrap();
        assert_eq!(report.tests_run, 2);
        assert!(report.undocumented_columns.contains(&"email".to_string()));
    }

    #[tokio::test]
    async fn not_null_fails_when_a_null_is_present() {
        let client = DuckDbClient::in_memory().unwrap();
        client
            .execute("CREATE TABLE users (id INTEGER)", &HashMap::new(), false)
            .await
            .unwrap();
        client
            .execute("INSERT INTO users VALUES (1), (NULL)", &HashMap::new(), false)
            .await
            .unwrap();

        let node = node_with_columns(
            "users",
            vec![ColumnConfig {
                name: "id".into(),
                tests: vec!["not_null".into()],
            }],
        );

        let result = run_tests(&node, &client).await;
        assert!(result.is_err());
    }
}
