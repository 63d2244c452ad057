pub mod catalog_builder;
pub mod column_normalizer;
pub mod executor;
pub mod query_planner;
pub mod report_pipeline;
pub mod sheet_ingestor;
pub mod sql_guard;
