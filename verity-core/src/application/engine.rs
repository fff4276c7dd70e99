// verity-core/src/application/engine.rs

use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, error, info, instrument};

use crate::error::VerityError;
use crate::ports::warehouse::WarehouseClient;

#[instrument(skip(client, query), fields(query.preview = %preview_sql(query)))]
pub async fn execute_query(client: &dyn WarehouseClient, query: &str) -> Result<(), VerityError> {
    let trimmed_query = query.trim();

    if trimmed_query.is_empty() {
        return Err(VerityError::InternalError(
            "attempted to execute an empty SQL query".into(),
        ));
    }

    let start = Instant::now();
    debug!("executing SQL");

    let result = client.execute(trimmed_query, &HashMap::new(), false).await;

    let duration = start.elapsed();

    match result {
        Ok(_) => {
            info!(target: "performance", "query finished in {:.2?}", duration);
            Ok(())
        }
        Err(e) => {
            error!(
                target: "warehouse",
                "query failed after {:.2?}: {} | sql: {}",
                duration, e, preview_sql(trimmed_query)
            );
            Err(e)
        }
    }
}

fn preview_sql(sql: &str) -> String {
    if sql.len() > 1000 {
        format!("{}...", &sql[..1000].replace('\n', " "))
    } else {
        sql.replace('\n', " ")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::DuckDbClient;

    #[tokio::test]
    async fn empty_query_is_rejected_before_reaching_the_warehouse() {
        let client = DuckDbClient::in_memory().unwrap();
        let result = execute_query(&client, "   ").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn valid_ddl_executes_successfully() {
        let client = DuckDbClient::in_memory().unwrap();
        execute_query(&client, "CREATE TABLE t (id INTEGER)")
            .await
            .unwrap();
        assert!(client.table_exists("t").await.unwrap());
    }
}
