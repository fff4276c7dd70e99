// verity-core/src/ports/warehouse.rs
//
// The boundary the rest of the system treats as opaque: execute SQL,
// fetch rows, run transactions, retry transient errors. Concrete
// implementations own a connection pool and retry policy; callers only
// see this trait.

use crate::error::VerityError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
}

/// One result row: an ordered column-name to value mapping.
pub type Row = HashMap<String, Value>;

#[async_trait]
pub trait WarehouseClient: Send + Sync {
    /// Executes `sql` on a pooled connection. `session_vars` are set on
    /// the same connection before the query runs. Returns rows when
    /// `fetch` is true, `None` otherwise.
    async fn execute(
        &self,
        sql: &str,
        session_vars: &HashMap<String, Value>,
        fetch: bool,
    ) -> Result<Option<Vec<Row>>, VerityError>;

    /// Runs every statement in order on one connection inside a
    /// transaction; rolls back on the first failure.
    async fn execute_tx(
        &self,
        sqls: &[String],
        session_vars: &HashMap<String, Value>,
    ) -> Result<(), VerityError>;

    async fn health_check(&self) -> Result<bool, VerityError>;

    async fn fetch_columns(&self, table_name: &str) -> Result<Vec<ColumnSchema>, VerityError>;

    async fn table_exists(&self, table_name: &str) -> Result<bool, VerityError>;
}
