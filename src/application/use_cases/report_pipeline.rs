use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::application::use_cases::catalog_builder::{Catalog, CatalogBuilder};
use crate::application::use_cases::executor::Executor;
use crate::application::use_cases::query_planner::QueryPlanner;
use crate::application::use_cases::sheet_ingestor::SheetIngestor;
use crate::application::use_cases::sql_guard::SqlGuard;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::domain::query::{QueryRequest, ResultSet, ValidatedQuery};
use crate::domain::schema::SchemaDescription;
use crate::infrastructure::db::sqlite::SqliteStore;
use crate::infrastructure::export::ResultWriter;
use crate::infrastructure::llm_clients::LLMClient;
use crate::infrastructure::spreadsheet::{discover_workbooks, WorkbookSource};

/// Outcome of one report request.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub query: ValidatedQuery,
    pub result: ResultSet,
}

/// Ingestion, then question or SQL, then guard, execute, and save.
pub struct ReportPipeline {
    catalog_builder: CatalogBuilder,
    planner: QueryPlanner,
    guard: SqlGuard,
    executor: Executor,
    writer: ResultWriter,
}

impl ReportPipeline {
    pub fn new(
        store: Arc<SqliteStore>,
        llm_client: Arc<dyn LLMClient + Send + Sync>,
        ingestor: SheetIngestor,
        writer: ResultWriter,
    ) -> Self {
        let guard = SqlGuard::new();
        Self {
            catalog_builder: CatalogBuilder::new(store.clone(), ingestor),
            planner: QueryPlanner::new(llm_client, guard),
            guard,
            executor: Executor::new(store),
            writer,
        }
    }

    pub fn writer(&self) -> &ResultWriter {
        &self.writer
    }

    /// Register every workbook in `raw_dir` whose extension is listed.
    pub async fn load_directory(&self, raw_dir: &Path, extensions: &[String]) -> Result<Catalog> {
        let sources: Vec<Box<dyn WorkbookSource>> = discover_workbooks(raw_dir, extensions)?
            .into_iter()
            .map(|workbook| Box::new(workbook) as Box<dyn WorkbookSource>)
            .collect();

        if sources.is_empty() {
            return Err(AppError::NoSourcesFound(raw_dir.display().to_string()));
        }

        info!(dir = %raw_dir.display(), files = sources.len(), "Loading workbooks");
        self.load_sources(&sources).await
    }

    pub async fn load_sources(&self, sources: &[Box<dyn WorkbookSource>]) -> Result<Catalog> {
        self.catalog_builder.build(sources).await
    }

    /// Both request modes end at the same guard; nothing unguarded reaches the store.
    pub async fn prepare(
        &self,
        config: &LLMConfig,
        schema: &SchemaDescription,
        request: &QueryRequest,
    ) -> Result<ValidatedQuery> {
        match request {
            QueryRequest::Question(question) => self.planner.plan(config, question, schema).await,
            QueryRequest::Sql(sql) => self.guard.validate(sql),
        }
    }

    /// Prepare, execute, and overwrite the CSV artifact with the full result.
    pub async fn run(
        &self,
        config: &LLMConfig,
        schema: &SchemaDescription,
        request: &QueryRequest,
    ) -> Result<Report> {
        let query = self.prepare(config, schema, request).await?;
        let result = self.executor.execute(&query).await?;
        self.writer.write(&result)?;
        Ok(Report { query, result })
    }
}
