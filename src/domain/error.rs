use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    ValidationError(String),
    ParseError(String),
    LLMError(String),
    SecurityError(String),
    DatabaseError(String),
    IoError(String),
    ConfigError(String),
    /// No spreadsheet sources were supplied to the catalog build.
    NoSourcesFound(String),
    /// A sheet had no usable rows or columns after cleanup. Callers skip it.
    EmptySheet(String),
    /// Two sheets in one catalog build produced the same table name.
    DuplicateTable(String),
    MissingCredential(String),
    NotAReadQuery,
    MultipleStatements,
    DisallowedKeyword(String),
    QueryExecution(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            AppError::LLMError(msg) => write!(f, "LLM error: {}", msg),
            AppError::SecurityError(msg) => write!(f, "Security error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::NoSourcesFound(location) => {
                write!(f, "No spreadsheet sources found in {}", location)
            }
            AppError::EmptySheet(sheet) => {
                write!(f, "Sheet '{}' has no rows or columns after cleanup", sheet)
            }
            AppError::DuplicateTable(table) => write!(
                f,
                "Table name '{}' is produced by more than one sheet",
                table
            ),
            AppError::MissingCredential(provider) => write!(
                f,
                "No API key configured for {}. Set OPENAI_API_KEY (e.g. in your .env file) \
                 or store one in the OS keychain with `report-builder set-key`",
                provider
            ),
            AppError::NotAReadQuery => write!(f, "Only SELECT/WITH queries are allowed"),
            AppError::MultipleStatements => write!(f, "Multiple statements are not allowed"),
            AppError::DisallowedKeyword(keyword) => {
                write!(f, "Disallowed SQL keyword detected: {}", keyword)
            }
            AppError::QueryExecution(msg) => write!(f, "SQL error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl AppError {
    /// Rejections the user can fix by submitting a different query.
    pub fn is_query_rejection(&self) -> bool {
        matches!(
            self,
            AppError::NotAReadQuery
                | AppError::MultipleStatements
                | AppError::DisallowedKeyword(_)
                | AppError::QueryExecution(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
