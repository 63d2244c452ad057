// ============================================================
// RESULT EXPORT
// ============================================================
// Writes a result set to the CSV artifact, replacing any earlier one

use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use tracing::info;

use crate::domain::error::{AppError, Result};
use crate::domain::query::{value_to_text, ResultSet};
use crate::infrastructure::storage::ensure_parent_dir;

/// Destination of the CSV artifact for one run.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    path: PathBuf,
}

impl ResultWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Header row plus every row of `result`, UTF-8, NULL as an empty field.
    pub fn write(&self, result: &ResultSet) -> Result<()> {
        ensure_parent_dir(&self.path)?;

        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_path(&self.path)
            .map_err(|e| self.error(e))?;

        writer
            .write_record(&result.columns)
            .map_err(|e| self.error(e))?;

        for row in &result.rows {
            writer
                .write_record(row.iter().map(value_to_text))
                .map_err(|e| self.error(e))?;
        }

        writer
            .flush()
            .map_err(|e| AppError::IoError(format!("Failed to flush {}: {}", self.path.display(), e)))?;

        info!(path = %self.path.display(), rows = result.row_count(), "Saved result");
        Ok(())
    }

    fn error(&self, err: csv::Error) -> AppError {
        AppError::IoError(format!("Failed to write {}: {}", self.path.display(), err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_write_header_rows_and_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ResultWriter::new(dir.path().join("outputs").join("result.csv"));
        let result = ResultSet {
            columns: vec!["source".to_string(), "calls".to_string()],
            rows: vec![
                vec![json!("web, paid"), json!(2)],
                vec![json!(null), json!(1.5)],
            ],
        };

        writer.write(&result).unwrap();

        let written = std::fs::read_to_string(writer.path()).unwrap();
        assert_eq!(written, "source,calls\n\"web, paid\",2\n,1.5\n");
    }

    #[test]
    fn test_write_overwrites_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ResultWriter::new(dir.path().join("result.csv"));

        writer
            .write(&ResultSet {
                columns: vec!["a".to_string()],
                rows: vec![vec![json!(1)], vec![json!(2)]],
            })
            .unwrap();
        writer
            .write(&ResultSet {
                columns: vec!["b".to_string()],
                rows: vec![],
            })
            .unwrap();

        assert_eq!(std::fs::read_to_string(writer.path()).unwrap(), "b\n");
    }
}
