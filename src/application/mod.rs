pub mod use_cases;

pub use use_cases::catalog_builder::{Catalog, CatalogBuilder};
pub use use_cases::executor::Executor;
pub use use_cases::query_planner::QueryPlanner;
pub use use_cases::report_pipeline::{Report, ReportPipeline};
pub use use_cases::sheet_ingestor::SheetIngestor;
pub use use_cases::sql_guard::SqlGuard;
