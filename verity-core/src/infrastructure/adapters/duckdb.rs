// verity-core/src/infrastructure/adapters/duckdb.rs
//
// `DuckDbClient`: the concrete `WarehouseClient` backed by DuckDB. Owns a
// small connection pool with lazy/eager initialization and a
// cheap-health-check-on-acquire discipline, plus an exponential-backoff
// retry wrapper around the fixed set of errors considered transient.
// Pool/retry shape grounded in the original `ConnectionPool`/query
// executor (pool_size, max_retries, retry_delay, lazy_init knobs; retry
// on a closed list of transient error codes, exponential backoff).

use async_trait::async_trait;
use duckdb::{Config, Connection};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::VerityError;
use crate::infrastructure::error::{DatabaseError, InfrastructureError};
use crate::ports::warehouse::{ColumnSchema, Row, WarehouseClient};

/// Pool/retry knobs. Mirrors the original's `ConnectionPool` constructor
/// arguments one-for-one so a profile's `outputs.<target>` maps directly.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub db_path: String,
    pub pool_size: usize,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub lazy_init: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            db_path: ":memory:".to_string(),
            pool_size: 1,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            lazy_init: true,
        }
    }
}

struct ConnectionPool {
    config: PoolConfig,
    idle: Mutex<VecDeque<Connection>>,
}

impl ConnectionPool {
    fn new(config: PoolConfig) -> Result<Self, InfrastructureError> {
        let mut idle = VecDeque::new();
        if !config.lazy_init {
            for _ in 0..config.pool_size.max(1) {
                idle.push_back(open_connection(&config.db_path)?);
            }
        }
        Ok(ConnectionPool {
            config,
            idle: Mutex::new(idle),
        })
    }

    /// Takes an idle connection if one passes a cheap health check,
    /// otherwise opens a fresh one. Never blocks on an exhausted pool:
    /// a fresh connection is always opened rather than waiting, matching
    /// the original's "pool exhausted -> temporary connection" behavior.
    async fn acquire(&self) -> Result<Connection, InfrastructureError> {
        let mut idle = self.idle.lock().await;
        while let Some(conn) = idle.pop_front() {
            if is_healthy(&conn) {
                return Ok(conn);
            }
            warn!("discarding unhealthy pooled connection");
        }
        drop(idle);
        open_connection(&self.config.db_path)
    }

    async fn release(&self, conn: Connection) {
        let mut idle = self.idle.lock().await;
        if idle.len() < self.config.pool_size.max(1) {
            idle.push_back(conn);
        }
    }
}

fn open_connection(db_path: &str) -> Result<Connection, InfrastructureError> {
    let config = Config::default();
    let conn = if db_path == ":memory:" {
        Connection::open_in_memory_with_flags(config)?
    } else {
        Connection::open_with_flags(db_path, config)?
    };
    Ok(conn)
}

fn is_healthy(conn: &Connection) -> bool {
    conn.execute("SELECT 1", []).is_ok()
}

/// `DuckDbClient` implements `WarehouseClient` over a `ConnectionPool`,
/// retrying transient failures with exponential backoff
/// (`retry_delay * 2^attempt`) up to `max_retries` times.
pub struct DuckDbClient {
    pool: ConnectionPool,
}

impl DuckDbClient {
    pub fn new(config: PoolConfig) -> Result<Self, InfrastructureError> {
        Ok(DuckDbClient {
            pool: ConnectionPool::new(config)?,
        })
    }

    pub fn in_memory() -> Result<Self, InfrastructureError> {
        Self::new(PoolConfig::default())
    }

    async fn with_retry<F, T>(&self, mut op: F) -> Result<T, VerityError>
    where
        F: FnMut(&Connection) -> Result<T, InfrastructureError>,
    {
        let max_retries = self.pool.config.max_retries;
        let mut attempt = 0;

        loop {
            let conn = self.pool.acquire().await?;
            let result = op(&conn);
            match result {
                Ok(value) => {
                    self.pool.release(conn).await;
                    return Ok(value);
                }
                Err(err) => {
                    self.pool.release(conn).await;
                    if attempt >= max_retries || !is_retryable(&err) {
                        return Err(err.into());
                    }
                    let delay = self.pool.config.retry_delay.mul_f64(2f64.powi(attempt as i32));
                    debug!(attempt, ?delay, "retrying after transient warehouse error");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Errors DuckDB surfaces for locking/IO contention are treated as
/// transient; everything else (syntax errors, constraint violations)
/// fails immediately.
fn is_retryable(err: &InfrastructureError) -> bool {
    let message = err.to_string().to_lowercase();
    message.contains("database is locked")
        || message.contains("could not set lock")
        || message.contains("resource busy")
        || message.contains("connection")
}

fn apply_session_vars(conn: &Connection, session_vars: &HashMap<String, Value>) -> Result<(), InfrastructureError> {
    for (key, value) in session_vars {
        let literal = match value {
            Value::String(s) => format!("'{}'", s.replace('\'', "''")),
            other => other.to_string(),
        };
        conn.execute(&format!("SET {key} = {literal}"), [])?;
    }
    Ok(())
}

#[async_trait]
impl WarehouseClient for DuckDbClient {
    async fn execute(
        &self,
        sql: &str,
        session_vars: &HashMap<String, Value>,
        fetch: bool,
    ) -> Result<Option<Vec<Row>>, VerityError> {
        let sql = sql.to_string();
        let session_vars = session_vars.clone();

        self.with_retry(move |conn| {
            apply_session_vars(conn, &session_vars)?;

            if !fetch {
                conn.execute(&sql, [])?;
                return Ok(None);
            }

            let mut stmt = conn.prepare(&sql)?;
            let column_names: Vec<String> = stmt.column_names();
            let mut rows_iter = stmt.query([])?;

            let mut rows = Vec::new();
            while let Some(row) = rows_iter.next()? {
                let mut map = HashMap::new();
                for (idx, name) in column_names.iter().enumerate() {
                    let value: Value = row
                        .get::<_, String>(idx)
                        .map(Value::String)
                        .unwrap_or(Value::Null);
                    map.insert(name.clone(), value);
                }
                rows.push(map);
            }
            Ok(Some(rows))
        })
        .await
    }

    async fn execute_tx(
        &self,
        sqls: &[String],
        session_vars: &HashMap<String, Value>,
    ) -> Result<(), VerityError> {
        let sqls = sqls.to_vec();
        let session_vars = session_vars.clone();

        self.with_retry(move |conn| {
            apply_session_vars(conn, &session_vars)?;
            conn.execute("BEGIN TRANSACTION", [])?;
            for sql in &sqls {
                if let Err(e) = conn.execute(sql, []) {
                    let _ = conn.execute("ROLLBACK", []);
                    return Err(InfrastructureError::from(e));
                }
            }
            conn.execute("COMMIT", [])?;
            Ok(())
        })
        .await
    }

    async fn health_check(&self) -> Result<bool, VerityError> {
        match self.pool.acquire().await {
            Ok(conn) => {
                let healthy = is_healthy(&conn);
                self.pool.release(conn).await;
                Ok(healthy)
            }
            Err(_) => Ok(false),
        }
    }

    async fn fetch_columns(&self, table_name: &str) -> Result<Vec<ColumnSchema>, VerityError> {
        let table_name = table_name.to_string();
        self.with_retry(move |conn| {
            let mut stmt = conn.prepare(&format!("PRAGMA table_info('{}')", table_name))?;
            let rows = stmt.query_map([], |row| {
                Ok(ColumnSchema {
                    name: row.get("name")?,
                    data_type: row.get("type")?,
                    is_nullable: !row.get::<_, bool>("notnull")?,
                })
            })?;

            let mut columns = Vec::new();
            for row in rows {
                columns.push(row.map_err(InfrastructureError::from)?);
            }
            Ok(columns)
        })
        .await
    }

    async fn table_exists(&self, table_name: &str) -> Result<bool, VerityError> {
        let table_name = table_name.to_string();
        self.with_retry(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT count(*) FROM information_schema.tables WHERE table_name = ?",
            )?;
            let count: i64 = stmt.query_row([&table_name], |row| row.get(0))?;
            Ok(count > 0)
        })
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn executes_ddl_and_fetches_columns() {
        let client = DuckDbClient::in_memory().unwrap();
        let empty = HashMap::new();

        client
            .execute(
                "CREATE TABLE test_users (id INTEGER, name VARCHAR, age INTEGER)",
                &empty,
                false,
            )
            .await
            .unwrap();
        client
            .execute("INSERT INTO test_users VALUES (1, 'Alice', 30)", &empty, false)
            .await
            .unwrap();

        let columns = client.fetch_columns("test_users").await.unwrap();
        assert_eq!(columns.len(), 3);
        assert!(columns.iter().any(|c| c.name == "name" && c.data_type == "VARCHAR"));
    }

    #[tokio::test]
    async fn table_exists_reflects_creation() {
        let client = DuckDbClient::in_memory().unwrap();
        let empty = HashMap::new();
        assert!(!client.table_exists("orders").await.unwrap());

        client
            .execute("CREATE TABLE orders (id INTEGER)", &empty, false)
            .await
            .unwrap();
        assert!(client.table_exists("orders").await.unwrap());
    }

    #[tokio::test]
    async fn invalid_sql_returns_an_error() {
        let client = DuckDbClient::in_memory().unwrap();
        let empty = HashMap::new();
        let result = client.execute("SELECT * FROM non_existent_table", &empty, true).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn transaction_rolls_back_on_failure() {
        let client = DuckDbClient::in_memory().unwrap();
        let empty = HashMap::new();
        client
            .execute("CREATE TABLE t (id INTEGER PRIMARY KEY)", &empty, false)
            .await
            .unwrap();

        let result = client
            .execute_tx(
                &[
                    "INSERT INTO t VALUES (1)".to_string(),
                    "INSERT INTO t VALUES (1)".to_string(),
                ],
                &empty,
            )
            .await;
        assert!(result.is_err());

        let rows = client
            .execute("SELECT * FROM t", &empty, true)
            .await
            .unwrap()
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn health_check_reports_true_for_a_live_pool() {
        let client = DuckDbClient::in_memory().unwrap();
        assert!(client.health_check().await.unwrap());
    }
}
