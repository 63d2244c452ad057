pub mod dataset;
pub mod error;
pub mod llm_config;
pub mod query;
pub mod schema;
