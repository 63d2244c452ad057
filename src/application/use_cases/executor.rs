use std::sync::Arc;

use tracing::{error, info};

use crate::domain::error::Result;
use crate::domain::query::{ResultSet, ValidatedQuery};
use crate::infrastructure::db::sqlite::SqliteStore;

/// Runs guarded queries against the catalog. Only a `ValidatedQuery` gets in.
pub struct Executor {
    store: Arc<SqliteStore>,
}

impl Executor {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, query: &ValidatedQuery) -> Result<ResultSet> {
        match self.store.fetch_result(query.as_str()).await {
            Ok(result) => {
                info!(
                    rows = result.row_count(),
                    columns = result.columns.len(),
                    "Query executed"
                );
                Ok(result)
            }
            Err(e) => {
                error!(sql = %query.as_str(), error = %e, "Query failed");
                Err(e)
            }
        }
    }
}
