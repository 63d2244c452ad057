use std::sync::Arc;

use tracing::{error, info};

use crate::application::use_cases::report_pipeline::ReportPipeline;
use crate::application::use_cases::sheet_ingestor::{KeywordHeaderPredicate, SheetIngestor};
use crate::domain::error::Result;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::db::sqlite::SqliteStore;
use crate::infrastructure::export::ResultWriter;
use crate::infrastructure::llm_clients::{LLMClient, OpenAIClient};

/// Open the store and wire the pipeline described by `config`.
pub async fn setup(config: &AppConfig) -> Result<ReportPipeline> {
    let store = SqliteStore::open(&config.paths.database)
        .await
        .map_err(|err| {
            error!(
                error = %err,
                database = %config.paths.database.display(),
                "Failed to open database"
            );
            err
        })?;

    let llm_client: Arc<dyn LLMClient + Send + Sync> = Arc::new(OpenAIClient::new());
    let ingestor = SheetIngestor::new(Box::new(KeywordHeaderPredicate::new(
        &config.ingest.header_keywords,
        config.ingest.min_header_matches,
    )));

    info!(
        provider = config.llm.provider.display_name(),
        model = %config.llm.model,
        output = %config.paths.output_csv.display(),
        "Pipeline ready"
    );

    Ok(ReportPipeline::new(
        Arc::new(store),
        llm_client,
        ingestor,
        ResultWriter::new(&config.paths.output_csv),
    ))
}
