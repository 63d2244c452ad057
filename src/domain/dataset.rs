use chrono::NaiveDateTime;
use std::fmt;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single spreadsheet cell after it has been read from the workbook.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Missing,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl CellValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    /// Text form used for header labels and VARCHAR storage.
    /// Missing cells render as an empty string.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Missing => String::new(),
            CellValue::Int(v) => v.to_string(),
            CellValue::Float(v) => v.to_string(),
            CellValue::Bool(v) => v.to_string(),
            CellValue::Text(v) => v.clone(),
            CellValue::Timestamp(v) => v.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    Boolean,
    Timestamp,
    Text,
}

impl ColumnType {
    /// Declared type used in `CREATE TABLE`; the store reports it back on introspection.
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Integer => "BIGINT",
            ColumnType::Float => "DOUBLE",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Text => "VARCHAR",
        }
    }

    /// Narrowest type that holds every non-missing value. Mixed or empty columns fall back to text.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a CellValue>) -> Self {
        let mut inferred: Option<ColumnType> = None;

        for value in values {
            let current = match value {
                CellValue::Missing => continue,
                CellValue::Int(_) => ColumnType::Integer,
                CellValue::Float(_) => ColumnType::Float,
                CellValue::Bool(_) => ColumnType::Boolean,
                CellValue::Timestamp(_) => ColumnType::Timestamp,
                CellValue::Text(_) => return ColumnType::Text,
            };

            inferred = Some(match (inferred, current) {
                (None, t) => t,
                (Some(a), b) if a == b => a,
                (Some(ColumnType::Integer), ColumnType::Float)
                | (Some(ColumnType::Float), ColumnType::Integer) => ColumnType::Float,
                _ => return ColumnType::Text,
            });
        }

        inferred.unwrap_or(ColumnType::Text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

/// One cleaned, rectangular table derived from a single sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Dataset {
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// A sheet exactly as read from the workbook: the first row is the file's own header.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSheet {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawSheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}
