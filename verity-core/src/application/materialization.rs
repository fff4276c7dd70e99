// verity-core/src/application/materialization.rs
//
// `Materializer`: executes the rendered SELECT for a model against a
// `WarehouseClient`, dispatching on `ModelConfig.materialized`.
// View/Table/TempTable are a single idempotent DDL statement. Incremental
// applies a merge/delete+insert strategy driven by `StateStore` fingerprints;
// CDC applies an upsert-then-retire pattern over `Vec<Row>` batches.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::domain::project::model_config::{IncrementalStrategy, MaterializationType, ModelConfig};
use crate::domain::ports::state_store::StateStore;
use crate::error::VerityError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::warehouse::{Row, WarehouseClient};

const CDC_CHUNK_SIZE: usize = 10_000_000;
const CDC_UPDATE_BATCH_SIZE: usize = 1_000;
const CDC_INSERT_BATCH_SIZE: usize = 1_000;
const OBSOLETE_DATE_COLUMN: &str = "obsolete_date";
const CDC_TIMESTAMP_COLUMN: &str = "__CDC_TIMESTAMP";

#[derive(Debug, Clone, Default)]
pub struct MaterializationResult {
    pub strategy: String,
    pub state: String,
    pub rows_inserted: usize,
    pub rows_updated: usize,
    pub rows_retired: usize,
    pub rows_deleted: usize,
    pub chunks_processed: usize,
}

impl MaterializationResult {
    fn simple(strategy: &str, state: &str) -> Self {
        MaterializationResult {
            strategy: strategy.to_string(),
            state: state.to_string(),
            ..Default::default()
        }
    }
}

pub struct Materializer;

impl Materializer {
    #[instrument(skip(client, state, select_sql), fields(model = model_name))]
    pub async fn materialize(
        client: &dyn WarehouseClient,
        state: &dyn StateStore,
        model_name: &str,
        select_sql: &str,
        config: &ModelConfig,
    ) -> Result<MaterializationResult, VerityError> {
        match config.materialized {
            MaterializationType::View => {
                Self::replace_simple(client, model_name, select_sql, "VIEW").await
            }
            MaterializationType::Table => {
                Self::replace_simple(client, model_name, select_sql, "TABLE").await
            }
            MaterializationType::TempTable => {
                Self::replace_simple(client, model_name, select_sql, "TEMPORARY TABLE").await
            }
            MaterializationType::Incremental => {
                Self::incremental(client, state, model_name, select_sql, config).await
            }
            MaterializationType::Cdc => {
                Self::cdc(client, model_name, select_sql, config).await
            }
        }
    }

    async fn replace_simple(
        client: &dyn WarehouseClient,
        model_name: &str,
        select_sql: &str,
        kind: &str,
    ) -> Result<MaterializationResult, VerityError> {
        let ddl = format!("CREATE OR REPLACE {kind} {model_name} AS {select_sql}");
        client
            .execute(&ddl, &HashMap::new(), false)
            .await
            .map_err(|e| materialization_error(model_name, kind, e))?;
        Ok(MaterializationResult::simple(&kind.to_lowercase(), "replaced"))
    }

    async fn incremental(
        client: &dyn WarehouseClient,
        state: &dyn StateStore,
        model_name: &str,
        select_sql: &str,
        config: &ModelConfig,
    ) -> Result<MaterializationResult, VerityError> {
        let strategy = config.incremental_strategy.ok_or_else(|| {
            VerityError::InternalError(format!(
                "model '{model_name}': incremental materialization requires incremental_strategy"
            ))
        })?;

        let exists = client.table_exists(model_name).await?;
        if !exists {
            let ddl = format!("CREATE TABLE {model_name} AS {select_sql}");
            client.execute(&ddl, &HashMap::new(), false).await?;
            if strategy == IncrementalStrategy::Time {
                state
                    .incremental_set(
                        model_name,
                        "last_processed_time",
                        Value::String(chrono::Utc::now().to_rfc3339()),
                    )
                    .await
                    .map_err(|e| VerityError::Domain(e))?;
            }
            return Ok(MaterializationResult::simple("incremental", "initial_load"));
        }

        match strategy {
            IncrementalStrategy::Append => {
                let sql = format!("INSERT INTO {model_name} {select_sql}");
                client.execute(&sql, &HashMap::new(), false).await?;
                Ok(MaterializationResult::simple("incremental", "appended"))
            }
            IncrementalStrategy::Time => {
                let time_column = config.time_column.as_deref().ok_or_else(|| {
                    VerityError::InternalError(format!(
                        "model '{model_name}': incremental strategy 'time' requires time_column"
                    ))
                })?;

                let watermark = match state
                    .incremental_get(model_name, "last_processed_time")
                    .await
                    .map_err(VerityError::Domain)?
                {
                    Some(Value::String(s)) => s,
                    _ => Self::max_time_column(client, model_name, time_column).await?,
                };

                let sql = format!(
                    "INSERT INTO {model_name} SELECT * FROM ({select_sql}) AS src WHERE {time_column} > '{watermark}'"
                );
                client.execute(&sql, &HashMap::new(), false).await?;

                state
                    .incremental_set(
                        model_name,
                        "last_processed_time",
                        Value::String(chrono::Utc::now().to_rfc3339()),
                    )
                    .await
                    .map_err(VerityError::Domain)?;

                Ok(MaterializationResult::simple("incremental", "updated"))
            }
            IncrementalStrategy::UniqueKey => {
                let unique_key = config.unique_key.as_deref().ok_or_else(|| {
                    VerityError::InternalError(format!(
                        "model '{model_name}': incremental strategy 'unique_key' requires unique_key"
                    ))
                })?;

                let temp_table = format!("{model_name}_incr_{}", Self::timestamp_suffix());
                client
                    .execute(
                        &format!("CREATE TEMPORARY TABLE {temp_table} AS {select_sql}"),
                        &HashMap::new(),
                        false,
                    )
                    .await?;

                let merge_sql = format!(
                    "MERGE INTO {model_name} USING {temp_table} ON {model_name}.{unique_key} = {temp_table}.{unique_key} \
                     WHEN MATCHED THEN UPDATE SET * WHEN NOT MATCHED THEN INSERT *"
                );
                let result = client.execute(&merge_sql, &HashMap::new(), false).await;

                let drop_sql = format!("DROP TABLE IF EXISTS {temp_table}");
                client.execute(&drop_sql, &HashMap::new(), false).await.ok();

                result?;
                Ok(MaterializationResult::simple("incremental", "merged"))
            }
        }
    }

    async fn max_time_column(
        client: &dyn WarehouseClient,
        model_name: &str,
        time_column: &str,
    ) -> Result<String, VerityError> {
        let sql = format!("SELECT MAX({time_column}) AS watermark FROM {model_name}");
        let rows = client
            .execute(&sql, &HashMap::new(), true)
            .await?
            .unwrap_or_default();
        let watermark = rows
            .first()
            .and_then(|row| row.get("watermark"))
            .map(value_to_sql_scalar)
            .unwrap_or_else(|| "1970-01-01".to_string());
        Ok(watermark.trim_matches('\'').to_string())
    }

    #[instrument(skip(client, select_sql), fields(model = model_name))]
    async fn cdc(
        client: &dyn WarehouseClient,
        model_name: &str,
        select_sql: &str,
        config: &ModelConfig,
    ) -> Result<MaterializationResult, VerityError> {
        let unique_key = config.unique_key.as_deref().ok_or_else(|| {
            VerityError::InternalError(format!(
                "model '{model_name}': cdc materialization requires unique_key"
            ))
        })?;
        let change_type_column = config.change_type_column();

        if !client.table_exists(model_name).await? {
            Self::cdc_initial_load(client, model_name, select_sql, unique_key, change_type_column)
                .await
        } else {
            Self::cdc_with_retirement(client, model_name, select_sql, unique_key, change_type_column)
                .await
        }
    }

    async fn cdc_initial_load(
        client: &dyn WarehouseClient,
        model_name: &str,
        select_sql: &str,
        unique_key: &str,
        change_type_column: &str,
    ) -> Result<MaterializationResult, VerityError> {
        info!("starting initial CDC load");

        let create_sql = format!(
            "CREATE TABLE {model_name} AS SELECT *, 'I' AS {change_type_column}, \
             CURRENT_TIMESTAMP AS {CDC_TIMESTAMP_COLUMN}, NULL AS {OBSOLETE_DATE_COLUMN} \
             FROM ({select_sql}) AS src LIMIT 0"
        );
        client.execute(&create_sql, &HashMap::new(), false).await?;

        let mut result = MaterializationResult::simple("cdc", "initial_load");
        let mut offset = 0usize;

        loop {
            let chunk_sql =
                format!("SELECT * FROM ({select_sql}) AS src LIMIT {CDC_CHUNK_SIZE} OFFSET {offset}");
            let mut rows = client
                .execute(&chunk_sql, &HashMap::new(), true)
                .await?
                .unwrap_or_default();
            if rows.is_empty() {
                break;
            }

            dedupe_by_key_keep_last(&mut rows, unique_key);
            for row in rows.iter_mut() {
                row.insert(change_type_column.to_string(), Value::String("I".to_string()));
                row.insert(OBSOLETE_DATE_COLUMN.to_string(), Value::Null);
            }

            let chunk_len = rows.len();
            insert_rows_via_temp_table(client, model_name, &rows).await?;

            result.rows_inserted += chunk_len;
            result.chunks_processed += 1;
            debug!(chunk = result.chunks_processed, rows = chunk_len, "processed initial load chunk");

            if rows.len() < CDC_CHUNK_SIZE {
                break;
            }
            offset += CDC_CHUNK_SIZE;
        }

        Ok(result)
    }

    async fn cdc_with_retirement(
        client: &dyn WarehouseClient,
        model_name: &str,
        select_sql: &str,
        unique_key: &str,
        change_type_column: &str,
    ) -> Result<MaterializationResult, VerityError> {
        info!("processing CDC with retirement pattern");

        let staging_table = format!("{model_name}_staging_{}", Self::timestamp_suffix());
        let create_staging_sql = format!(
            "CREATE TEMPORARY TABLE {staging_table} AS SELECT *, \
             COALESCE({change_type_column}, 'U') AS {change_type_column}, \
             CURRENT_TIMESTAMP AS {CDC_TIMESTAMP_COLUMN} FROM ({select_sql}) AS src"
        );

        let outcome = async {
            client.execute(&create_staging_sql, &HashMap::new(), false).await?;

            let mut result = MaterializationResult::simple("cdc", "processed");
            let mut offset = 0usize;

            loop {
                let chunk_sql = format!(
                    "SELECT * FROM {staging_table} LIMIT {CDC_CHUNK_SIZE} OFFSET {offset}"
                );
                let rows = client
                    .execute(&chunk_sql, &HashMap::new(), true)
                    .await?
                    .unwrap_or_default();
                if rows.is_empty() {
                    break;
                }

                let chunk_len = rows.len();
                Self::process_cdc_chunk(
                    client,
                    model_name,
                    unique_key,
                    change_type_column,
                    rows,
                    &mut result,
                )
                .await?;

                result.chunks_processed += 1;
                if chunk_len < CDC_CHUNK_SIZE {
                    break;
                }
                offset += CDC_CHUNK_SIZE;
            }

            if result.rows_inserted == 0
                && result.rows_updated == 0
                && result.rows_retired == 0
                && result.rows_deleted == 0
            {
                result.state = "no_changes".to_string();
            }

            Ok(result)
        }
        .await;

        let drop_sql = format!("DROP TABLE IF EXISTS {staging_table}");
        client.execute(&drop_sql, &HashMap::new(), false).await.ok();

        outcome
    }

    async fn process_cdc_chunk(
        client: &dyn WarehouseClient,
        model_name: &str,
        unique_key: &str,
        change_type_column: &str,
        rows: Vec<Row>,
        result: &mut MaterializationResult,
    ) -> Result<(), VerityError> {
        let mut inserts = Vec::new();
        let mut updates = Vec::new();
        let mut retirements = Vec::new();

        for row in rows {
            match row.get(change_type_column).and_then(Value::as_str) {
                Some("I") => inserts.push(row),
                Some("U") => updates.push(row),
                Some("D") | Some("E") => retirements.push(row),
                _ => updates.push(row),
            }
        }

        if !inserts.is_empty() {
            for row in inserts.iter_mut() {
                row.remove(change_type_column);
                row.remove(CDC_TIMESTAMP_COLUMN);
                row.insert(OBSOLETE_DATE_COLUMN.to_string(), Value::Null);
                row.insert(CDC_TIMESTAMP_COLUMN.to_string(), Value::String(chrono::Utc::now().to_rfc3339()));
            }
            result.rows_inserted += inserts.len();
            insert_rows_via_temp_table(client, model_name, &inserts).await?;
        }

        if !updates.is_empty() {
            let keys = unique_values(&updates, unique_key);
            let retired = retire_keys_in_batches(client, model_name, unique_key, &keys).await?;
            result.rows_retired += retired;

            let mut new_versions = updates;
            for row in new_versions.iter_mut() {
                row.insert(OBSOLETE_DATE_COLUMN.to_string(), Value::Null);
            }
            result.rows_updated += new_versions.len();
            insert_rows_via_temp_table(client, model_name, &new_versions).await?;
        }

        if !retirements.is_empty() {
            let keys = unique_values(&retirements, unique_key);
            let retired = retire_keys_in_batches(client, model_name, unique_key, &keys).await?;
            result.rows_deleted += retired;
        }

        Ok(())
    }

    fn timestamp_suffix() -> String {
        chrono::Utc::now().format("%Y%m%d%H%M%S%3f").to_string()
    }
}

fn materialization_error(model: &str, strategy: &str, err: VerityError) -> VerityError {
    VerityError::Infrastructure(InfrastructureError::Materialization {
        model: model.to_string(),
        strategy: strategy.to_lowercase(),
        reason: err.to_string(),
    })
}

fn dedupe_by_key_keep_last(rows: &mut Vec<Row>, unique_key: &str) {
    rows.sort_by(|a, b| {
        value_to_sql_scalar_opt(a.get(unique_key)).cmp(&value_to_sql_scalar_opt(b.get(unique_key)))
    });
    let mut seen = std::collections::HashSet::new();
    let mut deduped: Vec<Row> = Vec::with_capacity(rows.len());
    for row in rows.drain(..).rev() {
        let key = value_to_sql_scalar_opt(row.get(unique_key));
        if seen.insert(key) {
            deduped.push(row);
        }
    }
    deduped.reverse();
    *rows = deduped;
}

fn unique_values(rows: &[Row], unique_key: &str) -> Vec<Value> {
    let mut seen = std::collections::HashSet::new();
    let mut values = Vec::new();
    for row in rows {
        if let Some(v) = row.get(unique_key) {
            let repr = value_to_sql_scalar(v);
            if seen.insert(repr) {
                values.push(v.clone());
            }
        }
    }
    values
}

async fn retire_keys_in_batches(
    client: &dyn WarehouseClient,
    model_name: &str,
    unique_key: &str,
    keys: &[Value],
) -> Result<usize, VerityError> {
    let mut retired = 0;
    for batch in keys.chunks(CDC_UPDATE_BATCH_SIZE) {
        let keys_str = batch
            .iter()
            .map(value_to_sql_scalar)
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {model_name} SET {OBSOLETE_DATE_COLUMN} = CURRENT_TIMESTAMP \
             WHERE {unique_key} IN ({keys_str}) AND {OBSOLETE_DATE_COLUMN} IS NULL"
        );
        client.execute(&sql, &HashMap::new(), false).await?;
        retired += batch.len();
    }
    Ok(retired)
}

/// Creates a shape-matching temp table, bulk-inserts `rows` in batches of
/// up to 1000 records per multi-row `INSERT`, copies into `model_name`,
/// then drops the temp table unconditionally.
async fn insert_rows_via_temp_table(
    client: &dyn WarehouseClient,
    model_name: &str,
    rows: &[Row],
) -> Result<(), VerityError> {
    if rows.is_empty() {
        return Ok(());
    }

    let mut columns: Vec<String> = rows[0].keys().cloned().collect();
    columns.sort();

    let temp_table = format!("{model_name}_insert_{}", Materializer::timestamp_suffix());
    client
        .execute(
            &format!("CREATE TEMPORARY TABLE {temp_table} AS SELECT * FROM {model_name} LIMIT 0"),
            &HashMap::new(),
            false,
        )
        .await?;

    let outcome = async {
        for batch in rows.chunks(CDC_INSERT_BATCH_SIZE) {
            let values_list = batch
                .iter()
                .map(|row| {
                    let values = columns
                        .iter()
                        .map(|col| {
                            row.get(col)
                                .map(value_to_sql_scalar)
                                .unwrap_or_else(|| "NULL".to_string())
                        })
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("({values})")
                })
                .collect::<Vec<_>>()
                .join(", ");

            let insert_sql = format!(
                "INSERT INTO {temp_table} ({}) VALUES {values_list}",
                columns.join(", ")
            );
            client.execute(&insert_sql, &HashMap::new(), false).await?;
        }

        client
            .execute(
                &format!("INSERT INTO {model_name} SELECT * FROM {temp_table}"),
                &HashMap::new(),
                false,
            )
            .await?;
        Ok(())
    }
    .await;

    let drop_sql = format!("DROP TABLE IF EXISTS {temp_table}");
    client.execute(&drop_sql, &HashMap::new(), false).await.ok();

    outcome
}

pub(crate) fn value_to_sql_scalar(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Bool(b) => if *b { "TRUE".to_string() } else { "FALSE".to_string() },
        other => other.to_string(),
    }
}

fn value_to_sql_scalar_opt(value: Option<&Value>) -> String {
    value.map(value_to_sql_scalar).unwrap_or_else(|| "NULL".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::state::ModelState;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    struct MockWarehouse {
        executed: StdMutex<Vec<String>>,
        table_exists: bool,
        fetch_rows: Vec<Row>,
    }

    impl MockWarehouse {
        fn new(table_exists: bool, fetch_rows: Vec<Row>) -> Self {
            MockWarehouse {
                executed: StdMutex::new(Vec::new()),
                table_exists,
                fetch_rows,
            }
        }

        fn queries(&self) -> Vec<String> {
            self.executed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WarehouseClient for MockWarehouse {
        async fn execute(
            &self,
            sql: &str,
            _session_vars: &HashMap<String, Value>,
            fetch: bool,
        ) -> Result<Option<Vec<Row>>, VerityError> {
            self.executed.lock().unwrap().push(sql.to_string());
            if fetch && sql.contains("staging") {
                return Ok(Some(self.fetch_rows.clone()));
            }
            if fetch && sql.contains("FROM (") {
                return Ok(Some(self.fetch_rows.clone()));
            }
            if fetch {
                return Ok(Some(Vec::new()));
            }
            Ok(None)
        }

        async fn execute_tx(&self, _sqls: &[String], _session_vars: &HashMap<String, Value>) -> Result<(), VerityError> {
            Ok(())
        }

        async fn health_check(&self) -> Result<bool, VerityError> {
            Ok(true)
        }

        async fn fetch_columns(&self, _table_name: &str) -> Result<Vec<crate::ports::warehouse::ColumnSchema>, VerityError> {
            Ok(vec![])
        }

        async fn table_exists(&self, _table_name: &str) -> Result<bool, VerityError> {
            Ok(self.table_exists)
        }
    }

    struct NullStateStore;

    #[async_trait]
    impl StateStore for NullStateStore {
        async fn get(&self, _model_name: &str) -> Result<Option<ModelState>, crate::domain::error::DomainError> {
            Ok(None)
        }
        async fn update_fingerprint(&self, _: &str, _: &str, _: &[String], _: Option<&str>) -> Result<(), crate::domain::error::DomainError> {
            Ok(())
        }
        async fn mark_execution(&self, _: &str, _: bool) -> Result<(), crate::domain::error::DomainError> {
            Ok(())
        }
        async fn changed_since(&self, _: &str, _: &str, _: Option<&str>) -> Result<bool, crate::domain::error::DomainError> {
            Ok(true)
        }
        async fn incremental_get(&self, _: &str, _: &str) -> Result<Option<Value>, crate::domain::error::DomainError> {
            Ok(None)
        }
        async fn incremental_set(&self, _: &str, _: &str, _: Value) -> Result<(), crate::domain::error::DomainError> {
            Ok(())
        }
        async fn changed_models(&self, _: &HashMap<String, crate::domain::ports::state_store::Fingerprint>) -> Result<std::collections::HashSet<String>, crate::domain::error::DomainError> {
            Ok(std::collections::HashSet::new())
        }
        async fn clear(&self, _: Option<&str>) -> Result<(), crate::domain::error::DomainError> {
            Ok(())
        }
        async fn export(&self) -> Result<Vec<ModelState>, crate::domain::error::DomainError> {
            Ok(vec![])
        }
        async fn import(&self, _: Vec<ModelState>) -> Result<(), crate::domain::error::DomainError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn view_materialization_issues_create_or_replace() {
        let warehouse = MockWarehouse::new(false, vec![]);
        let state = NullStateStore;
        let config = ModelConfig::default();

        let result = Materializer::materialize(&warehouse, &state, "my_model", "SELECT 1", &config)
            .await
            .unwrap();

        assert_eq!(result.strategy, "view");
        assert_eq!(warehouse.queries()[0], "CREATE OR REPLACE VIEW my_model AS SELECT 1");
    }

    #[tokio::test]
    async fn table_materialization_replaces_unconditionally() {
        let warehouse = MockWarehouse::new(false, vec![]);
        let state = NullStateStore;
        let config = ModelConfig {
            materialized: MaterializationType::Table,
            ..Default::default()
        };

        let result = Materializer::materialize(&warehouse, &state, "my_table", "SELECT * FROM src", &config)
            .await
            .unwrap();

        assert_eq!(result.strategy, "table");
        assert_eq!(
            warehouse.queries()[0],
            "CREATE OR REPLACE TABLE my_table AS SELECT * FROM src"
        );
    }

    #[tokio::test]
    async fn incremental_append_creates_table_on_first_run() {
        let warehouse = MockWarehouse::new(false, vec![]);
        let state = NullStateStore;
        let config = ModelConfig {
            materialized: MaterializationType::Incremental,
            incremental_strategy: Some(IncrementalStrategy::Append),
            ..Default::default()
        };

        let result = Materializer::materialize(&warehouse, &state, "events", "SELECT * FROM src", &config)
            .await
            .unwrap();

        assert_eq!(result.state, "initial_load");
        assert!(warehouse.queries()[0].starts_with("CREATE TABLE events AS"));
    }

    #[tokio::test]
    async fn incremental_append_inserts_on_subsequent_runs() {
        let warehouse = MockWarehouse::new(true, vec![]);
        let state = NullStateStore;
        let config = ModelConfig {
            materialized: MaterializationType::Incremental,
            incremental_strategy: Some(IncrementalStrategy::Append),
            ..Default::default()
        };

        let result = Materializer::materialize(&warehouse, &state, "events", "SELECT * FROM src", &config)
            .await
            .unwrap();

        assert_eq!(result.state, "appended");
        assert_eq!(warehouse.queries()[0], "INSERT INTO events SELECT * FROM src");
    }

    #[tokio::test]
    async fn cdc_initial_load_inserts_all_rows_with_obsolete_date_null() {
        let mut row = HashMap::new();
        row.insert("id".to_string(), Value::Number(1.into()));
        row.insert("name".to_string(), Value::String("alice".to_string()));

        let warehouse = MockWarehouse::new(false, vec![row]);
        let state = NullStateStore;
        let config = ModelConfig {
            materialized: MaterializationType::Cdc,
            unique_key: Some("id".to_string()),
            ..Default::default()
        };

        let result = Materializer::materialize(&warehouse, &state, "customers", "SELECT * FROM src", &config)
            .await
            .unwrap();

        assert_eq!(result.strategy, "cdc");
        assert_eq!(result.rows_inserted, 1);
    }

    #[tokio::test]
    async fn cdc_with_existing_table_classifies_by_change_type() {
        let mut insert_row = HashMap::new();
        insert_row.insert("id".to_string(), Value::Number(1.into()));
        insert_row.insert("__CDC_OPERATION".to_string(), Value::String("I".to_string()));

        let mut delete_row = HashMap::new();
        delete_row.insert("id".to_string(), Value::Number(2.into()));
        delete_row.insert("__CDC_OPERATION".to_string(), Value::String("D".to_string()));

        let warehouse = MockWarehouse::new(true, vec![insert_row, delete_row]);
        let state = NullStateStore;
        let config = ModelConfig {
            materialized: MaterializationType::Cdc,
            unique_key: Some("id".to_string()),
            ..Default::default()
        };

        let result = Materializer::materialize(&warehouse, &state, "customers", "SELECT * FROM src", &config)
            .await
            .unwrap();

        assert_eq!(result.rows_inserted, 1);
        assert_eq!(result.rows_deleted, 1);
    }
}
