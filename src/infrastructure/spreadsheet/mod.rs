use crate::domain::dataset::{CellValue, RawSheet};
use crate::domain::error::{AppError, Result};
use calamine::{open_workbook_auto, Data, DataType, Reader};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Largest magnitude at which an f64 still holds every integer exactly.
const MAX_EXACT_FLOAT_INT: f64 = 9_007_199_254_740_992.0;

/// One spreadsheet source: a name used for table naming and its sheets.
pub trait WorkbookSource: Send + Sync {
    /// Stem used as the table-name prefix, e.g. `calls` for `calls.xlsx`.
    fn name(&self) -> &str;
    fn read_sheets(&self) -> Result<Vec<RawSheet>>;
}

/// A workbook file readable by calamine (xlsx, xlsm, xls, ods).
#[derive(Debug, Clone)]
pub struct ExcelWorkbook {
    path: PathBuf,
    stem: String,
}

impl ExcelWorkbook {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, stem }
    }
}

impl WorkbookSource for ExcelWorkbook {
    fn name(&self) -> &str {
        &self.stem
    }

    fn read_sheets(&self) -> Result<Vec<RawSheet>> {
        info!(file = %self.path.display(), "Reading workbook");

        let mut workbook = open_workbook_auto(&self.path).map_err(|e| {
            AppError::ParseError(format!(
                "Failed to open spreadsheet {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let mut sheets = Vec::new();
        for sheet_name in workbook.sheet_names() {
            let range = workbook.worksheet_range(&sheet_name).map_err(|e| {
                AppError::ParseError(format!(
                    "Failed to read sheet '{}' of {}: {}",
                    sheet_name,
                    self.path.display(),
                    e
                ))
            })?;

            let rows: Vec<Vec<CellValue>> = range
                .rows()
                .map(|row| row.iter().map(cell_value).collect())
                .collect();

            debug!(sheet = %sheet_name, rows = rows.len(), "Read sheet");
            sheets.push(RawSheet::new(sheet_name, rows));
        }

        Ok(sheets)
    }
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Missing,
        Data::Int(v) => CellValue::Int(*v),
        // Excel stores every number as a float; whole values read back as integers.
        Data::Float(v) if v.fract() == 0.0 && v.abs() < MAX_EXACT_FLOAT_INT => {
            CellValue::Int(*v as i64)
        }
        Data::Float(v) => CellValue::Float(*v),
        Data::Bool(v) => CellValue::Bool(*v),
        Data::String(s) => CellValue::Text(s.clone()),
        other => other
            .as_datetime()
            .map(CellValue::Timestamp)
            .unwrap_or_else(|| CellValue::Text(other.to_string())),
    }
}

/// Spreadsheet files in `dir` whose extension is in `extensions`, ordered by file name.
/// Office lock files (`~$name.xlsx`) are ignored.
pub fn discover_workbooks(dir: &Path, extensions: &[String]) -> Result<Vec<ExcelWorkbook>> {
    if !dir.is_dir() {
        return Err(AppError::NoSourcesFound(format!(
            "{} (directory does not exist)",
            dir.display()
        )));
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            let is_lock_file = path
                .file_name()
                .map(|n| n.to_string_lossy().starts_with("~$"))
                .unwrap_or(false);
            let has_extension = path
                .extension()
                .map(|ext| {
                    extensions
                        .iter()
                        .any(|wanted| ext.to_string_lossy().eq_ignore_ascii_case(wanted))
                })
                .unwrap_or(false);
            has_extension && !is_lock_file
        })
        .collect();

    paths.sort();
    Ok(paths.into_iter().map(ExcelWorkbook::new).collect())
}
