use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use crate::application::use_cases::sheet_ingestor::SheetIngestor;
use crate::domain::dataset::Dataset;
use crate::domain::error::{AppError, Result};
use crate::domain::schema::{SchemaDescription, TableSchema};
use crate::infrastructure::db::sqlite::SqliteStore;
use crate::infrastructure::spreadsheet::WorkbookSource;

/// A sheet left out of the catalog, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSheet {
    pub source: String,
    pub sheet: String,
    pub reason: String,
}

/// Everything registered by one build, in registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub tables: Vec<String>,
    pub schema: SchemaDescription,
    pub skipped: Vec<SkippedSheet>,
}

pub struct CatalogBuilder {
    store: Arc<SqliteStore>,
    ingestor: SheetIngestor,
}

impl CatalogBuilder {
    pub fn new(store: Arc<SqliteStore>, ingestor: SheetIngestor) -> Self {
        Self { store, ingestor }
    }

    /// Ingest every sheet of every source and register it in the store.
    ///
    /// Empty sheets are skipped. Any other failure stops the build; tables
    /// registered before it stay in the store.
    pub async fn build(&self, sources: &[Box<dyn WorkbookSource>]) -> Result<Catalog> {
        if sources.is_empty() {
            return Err(AppError::NoSourcesFound("the given source list".to_string()));
        }

        let mut catalog = Catalog::default();
        let mut registered: HashSet<String> = HashSet::new();

        for source in sources {
            for sheet in source.read_sheets()? {
                let mut ingested = match self.ingestor.ingest(source.name(), &sheet) {
                    Ok(ingested) => ingested,
                    Err(AppError::EmptySheet(location)) => {
                        warn!(source = %source.name(), sheet = %sheet.name, "Skipping empty sheet");
                        catalog.skipped.push(SkippedSheet {
                            source: source.name().to_string(),
                            sheet: sheet.name.clone(),
                            reason: AppError::EmptySheet(location).to_string(),
                        });
                        continue;
                    }
                    Err(e) => return Err(e),
                };

                let table = ingested.table_name.clone();
                if !registered.insert(table.clone()) {
                    return Err(AppError::DuplicateTable(table));
                }

                let renamed = dedupe_column_names(&mut ingested.dataset);
                if !renamed.is_empty() {
                    warn!(table = %table, columns = ?renamed, "Renamed duplicate columns");
                }

                self.store.register_dataset(&table, &ingested.dataset).await?;
                info!(
                    table = %table,
                    rows = ingested.dataset.row_count(),
                    columns = ingested.dataset.columns.len(),
                    header_promoted = ingested.header_promoted,
                    "Registered table"
                );

                catalog.schema.push(TableSchema {
                    table_name: table.clone(),
                    columns: self.store.describe_table(&table).await?,
                });
                catalog.tables.push(table);
            }
        }

        Ok(catalog)
    }
}

/// Make column names unique by suffixing repeats with `_2`, `_3`, ... in column order.
/// Returns the new names given to renamed columns.
fn dedupe_column_names(dataset: &mut Dataset) -> Vec<String> {
    let original: HashSet<String> = dataset.columns.iter().map(|c| c.name.clone()).collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut renamed = Vec::new();

    for column in dataset.columns.iter_mut() {
        if seen.insert(column.name.clone()) {
            continue;
        }

        let mut suffix = 2;
        let candidate = loop {
            let candidate = format!("{}_{}", column.name, suffix);
            if !seen.contains(&candidate) && !original.contains(&candidate) {
                break candidate;
            }
            suffix += 1;
        };

        seen.insert(candidate.clone());
        column.name = candidate.clone();
        renamed.push(candidate);
    }

    renamed
}
