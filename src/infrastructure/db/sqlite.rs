use crate::domain::dataset::{CellValue, ColumnType, Dataset, TIMESTAMP_FORMAT};
use crate::domain::error::{AppError, Result};
use crate::domain::query::ResultSet;
use crate::domain::schema::ColumnSchema;
use crate::infrastructure::storage::ensure_parent_dir;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::query::Query;
use sqlx::{Column, Row, Sqlite, Statement, TypeInfo, ValueRef};
use std::path::Path;
use tracing::{debug, info};

/// File-backed relational store holding every registered sheet.
///
/// Two single-connection pools over the same file: `pool` registers sheets,
/// `read_pool` runs every guarded query with `query_only` set, so the engine
/// itself refuses any write that reaches it.
pub struct SqliteStore {
    pool: SqlitePool,
    read_pool: SqlitePool,
}

impl SqliteStore {
    pub async fn open(path: &Path) -> Result<Self> {
        ensure_parent_dir(path)?;

        let write_options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = Self::connect(write_options).await?;

        let read_options = SqliteConnectOptions::new()
            .filename(path)
            .pragma("query_only", "ON");
        let read_pool = Self::connect(read_options).await?;

        info!(store = %path.display(), "Opened relational store");
        Ok(Self { pool, read_pool })
    }

    async fn connect(options: SqliteConnectOptions) -> Result<SqlitePool> {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {}", e)))
    }

    /// Register `dataset` as `table`, dropping any existing table of that name first.
    pub async fn register_dataset(&self, table: &str, dataset: &Dataset) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to begin transaction: {}", e)))?;

        sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)))
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to drop table {}: {}", table, e)))?;

        let column_defs = dataset
            .columns
            .iter()
            .map(|c| format!("{} {}", quote_ident(&c.name), c.column_type.sql_type()))
            .collect::<Vec<_>>()
            .join(", ");

        sqlx::query(&format!("CREATE TABLE {} ({})", quote_ident(table), column_defs))
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to create table {}: {}", table, e))
            })?;

        let placeholders = vec!["?"; dataset.columns.len()].join(", ");
        let insert_sql = format!(
            "INSERT INTO {} VALUES ({})",
            quote_ident(table),
            placeholders
        );

        for row in &dataset.rows {
            let mut query = sqlx::query(&insert_sql);
            for (cell, column) in row.iter().zip(&dataset.columns) {
                query = bind_cell(query, cell, column.column_type);
            }
            query.execute(&mut *tx).await.map_err(|e| {
                AppError::DatabaseError(format!("Failed to insert into {}: {}", table, e))
            })?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to commit {}: {}", table, e)))?;

        debug!(table, rows = dataset.row_count(), "Registered dataset");
        Ok(())
    }

    /// Column names and declared types of `table`, in declaration order.
    pub async fn describe_table(&self, table: &str) -> Result<Vec<ColumnSchema>> {
        let rows = sqlx::query(&format!("PRAGMA table_info({})", quote_ident(table)))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to describe table {}: {}", table, e))
            })?;

        if rows.is_empty() {
            return Err(AppError::DatabaseError(format!(
                "Table {} does not exist",
                table
            )));
        }

        rows.iter()
            .map(|row| {
                let name: String = row.try_get("name").map_err(|e| {
                    AppError::DatabaseError(format!("Failed to parse column name: {}", e))
                })?;
                let data_type: String = row.try_get("type").map_err(|e| {
                    AppError::DatabaseError(format!("Failed to parse column type: {}", e))
                })?;
                Ok(ColumnSchema { name, data_type })
            })
            .collect()
    }

    pub async fn table_exists(&self, table: &str) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to look up {}: {}", table, e)))?;

        let count: i64 = row
            .try_get("n")
            .map_err(|e| AppError::DatabaseError(format!("Failed to parse count: {}", e)))?;
        Ok(count > 0)
    }

    /// Run `sql` on the read-only connection and materialize every row.
    /// Engine diagnostics, including write attempts, surface as `QueryExecution`.
    pub async fn fetch_result(&self, sql: &str) -> Result<ResultSet> {
        use sqlx::Executor;

        let statement = (&self.read_pool)
            .prepare(sql)
            .await
            .map_err(|e| AppError::QueryExecution(engine_message(&e)))?;

        let columns: Vec<String> = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        // Declared types, e.g. BOOLEAN for a column read straight from a registered table.
        let declared: Vec<String> = statement
            .columns()
            .iter()
            .map(|c| c.type_info().name().to_string())
            .collect();

        let rows = sqlx::query(sql)
            .fetch_all(&self.read_pool)
            .await
            .map_err(|e| AppError::QueryExecution(engine_message(&e)))?;

        let rows = rows
            .iter()
            .map(|row| {
                (0..row.columns().len())
                    .map(|i| {
                        let value = extract_column_value(row, i);
                        match (declared.get(i).map(String::as_str), &value) {
                            (Some("BOOLEAN"), serde_json::Value::Number(n)) => {
                                serde_json::Value::Bool(n.as_i64().unwrap_or(0) != 0)
                            }
                            _ => value,
                        }
                    })
                    .collect()
            })
            .collect();

        Ok(ResultSet { columns, rows })
    }
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn engine_message(err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db) => db.message().to_string(),
        other => other.to_string(),
    }
}

fn bind_cell<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    cell: &CellValue,
    column_type: ColumnType,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match (cell, column_type) {
        (CellValue::Missing, _) => query.bind(Option::<String>::None),
        (CellValue::Int(v), ColumnType::Float) => query.bind(*v as f64),
        (CellValue::Int(v), ColumnType::Integer) => query.bind(*v),
        (CellValue::Float(v), ColumnType::Float) => query.bind(*v),
        (CellValue::Bool(v), ColumnType::Boolean) => query.bind(*v),
        (CellValue::Timestamp(v), ColumnType::Timestamp) => {
            query.bind(v.format(TIMESTAMP_FORMAT).to_string())
        }
        (other, _) => query.bind(other.to_text()),
    }
}

/// Extract a column value from a row as serde_json::Value, by the value's storage class.
fn extract_column_value(row: &SqliteRow, index: usize) -> serde_json::Value {
    let Ok(raw) = row.try_get_raw(index) else {
        return serde_json::Value::Null;
    };
    if raw.is_null() {
        return serde_json::Value::Null;
    }
    let type_name = raw.type_info().name().to_string();

    match type_name.as_str() {
        "INTEGER" => row
            .try_get::<i64, _>(index)
            .map(|n| serde_json::Value::Number(n.into()))
            .unwrap_or(serde_json::Value::Null),
        "REAL" => row
            .try_get::<f64, _>(index)
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        "BLOB" => row
            .try_get::<Vec<u8>, _>(index)
            .map(|bytes| serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned()))
            .unwrap_or(serde_json::Value::Null),
        _ => row
            .try_get::<String, _>(index)
            .map(serde_json::Value::String)
            .unwrap_or(serde_json::Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::Column;
    use serde_json::json;

    fn dataset() -> Dataset {
        Dataset {
            columns: vec![
                Column {
                    name: "agent".to_string(),
                    column_type: ColumnType::Text,
                },
                Column {
                    name: "duration".to_string(),
                    column_type: ColumnType::Integer,
                },
                Column {
                    name: "score".to_string(),
                    column_type: ColumnType::Float,
                },
            ],
            rows: vec![
                vec![
                    CellValue::Text("Ana".to_string()),
                    CellValue::Int(30),
                    CellValue::Float(0.5),
                ],
                vec![
                    CellValue::Text("Ben".to_string()),
                    CellValue::Int(45),
                    CellValue::Int(2),
                ],
                vec![CellValue::Missing, CellValue::Missing, CellValue::Missing],
            ],
        }
    }

    async fn temp_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("store.db")).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_register_and_describe() {
        let (_dir, store) = temp_store().await;
        store.register_dataset("agents_sheet1", &dataset()).await.unwrap();

        let columns = store.describe_table("agents_sheet1").await.unwrap();
        let described: Vec<(&str, &str)> = columns
            .iter()
            .map(|c| (c.name.as_str(), c.data_type.as_str()))
            .collect();
        assert_eq!(
            described,
            vec![("agent", "VARCHAR"), ("duration", "BIGINT"), ("score", "DOUBLE")]
        );
        assert!(store.table_exists("agents_sheet1").await.unwrap());
        assert!(!store.table_exists("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_register_replaces_existing_table() {
        let (_dir, store) = temp_store().await;
        store.register_dataset("t", &dataset()).await.unwrap();
        store.register_dataset("t", &dataset()).await.unwrap();

        let result = store.fetch_result("SELECT COUNT(*) AS n FROM t").await.unwrap();
        assert_eq!(result.columns, vec!["n"]);
        assert_eq!(result.rows, vec![vec![json!(3)]]);
    }

    #[tokio::test]
    async fn test_fetch_result_values_and_nulls() {
        let (_dir, store) = temp_store().await;
        store.register_dataset("t", &dataset()).await.unwrap();

        let result = store
            .fetch_result("SELECT agent, duration, score FROM t ORDER BY rowid")
            .await
            .unwrap();
        assert_eq!(result.rows[0], vec![json!("Ana"), json!(30), json!(0.5)]);
        assert_eq!(result.rows[1], vec![json!("Ben"), json!(45), json!(2.0)]);
        assert_eq!(
            result.rows[2],
            vec![serde_json::Value::Null, serde_json::Value::Null, serde_json::Value::Null]
        );
    }

    #[tokio::test]
    async fn test_empty_result_keeps_columns() {
        let (_dir, store) = temp_store().await;
        store.register_dataset("t", &dataset()).await.unwrap();

        let result = store
            .fetch_result("SELECT agent, duration FROM t WHERE duration > 1000")
            .await
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(result.columns, vec!["agent", "duration"]);
    }

    #[tokio::test]
    async fn test_engine_error_is_query_execution() {
        let (_dir, store) = temp_store().await;
        let err = store.fetch_result("SELECT * FROM nowhere").await.unwrap_err();
        match err {
            AppError::QueryExecution(msg) => assert!(msg.contains("nowhere"), "{}", msg),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_query_connection_refuses_writes() {
        let (_dir, store) = temp_store().await;
        store.register_dataset("t", &dataset()).await.unwrap();

        let err = store
            .fetch_result("WITH x AS (SELECT 'evil' AS r) REPLACE INTO t (agent) SELECT r FROM x")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::QueryExecution(_)), "{:?}", err);

        let result = store.fetch_result("SELECT COUNT(*) FROM t").await.unwrap();
        assert_eq!(result.rows, vec![vec![json!(3)]]);
    }

    #[tokio::test]
    async fn test_boolean_columns_read_back_as_booleans() {
        let (_dir, store) = temp_store().await;
        let flags = Dataset {
            columns: vec![Column {
                name: "answered".to_string(),
                column_type: ColumnType::Boolean,
            }],
            rows: vec![
                vec![CellValue::Bool(true)],
                vec![CellValue::Bool(false)],
                vec![CellValue::Missing],
            ],
        };
        store.register_dataset("flags", &flags).await.unwrap();

        let result = store
            .fetch_result("SELECT answered FROM flags ORDER BY rowid")
            .await
            .unwrap();
        assert_eq!(
            result.rows,
            vec![vec![json!(true)], vec![json!(false)], vec![serde_json::Value::Null]]
        );
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("calls"), "\"calls\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }
}
