//! Sheet Ingestor
//!
//! Turns one raw sheet into a clean [`Dataset`]:
//! - Drops fully empty rows and columns
//! - Promotes the first data row to header when it looks like one
//! - Normalizes column names and drops "unnamed" placeholder columns
//! - Trims text cells, keeping missing cells missing
//! - Infers a column type per column

use std::collections::HashSet;

use crate::application::use_cases::column_normalizer::{
    is_unnamed_placeholder, normalize_column, table_name_for,
};
use crate::domain::dataset::{CellValue, Column, ColumnType, Dataset, RawSheet};
use crate::domain::error::{AppError, Result};

pub const DEFAULT_HEADER_KEYWORDS: [&str; 6] =
    ["date", "callerid", "source", "phone", "duration", "recording"];
pub const DEFAULT_MIN_HEADER_MATCHES: usize = 2;

/// Decides whether a row of cell texts is a header that landed in the data.
pub trait HeaderPredicate: Send + Sync {
    fn looks_like_header(&self, cells: &[String]) -> bool;
}

/// Header check by keyword vocabulary: a row is a header when at least
/// `min_matches` of its distinct lowercased, trimmed cells are known keywords.
#[derive(Debug, Clone)]
pub struct KeywordHeaderPredicate {
    keywords: HashSet<String>,
    min_matches: usize,
}

impl KeywordHeaderPredicate {
    pub fn new<I, S>(keywords: I, min_matches: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .collect(),
            min_matches,
        }
    }
}

impl Default for KeywordHeaderPredicate {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER_KEYWORDS, DEFAULT_MIN_HEADER_MATCHES)
    }
}

impl HeaderPredicate for KeywordHeaderPredicate {
    fn looks_like_header(&self, cells: &[String]) -> bool {
        let distinct: HashSet<String> = cells.iter().map(|c| c.trim().to_lowercase()).collect();
        distinct.intersection(&self.keywords).count() >= self.min_matches
    }
}

/// A cleaned sheet plus the table name it would be registered under.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedSheet {
    pub table_name: String,
    pub dataset: Dataset,
    pub header_promoted: bool,
}

pub struct SheetIngestor {
    header_predicate: Box<dyn HeaderPredicate>,
}

impl Default for SheetIngestor {
    fn default() -> Self {
        Self::new(Box::new(KeywordHeaderPredicate::default()))
    }
}

impl SheetIngestor {
    pub fn new(header_predicate: Box<dyn HeaderPredicate>) -> Self {
        Self { header_predicate }
    }

    /// Clean one sheet of `source_stem`. Fails with `EmptySheet` when nothing usable remains.
    pub fn ingest(&self, source_stem: &str, sheet: &RawSheet) -> Result<IngestedSheet> {
        let table_name = table_name_for(source_stem, &sheet.name);
        let empty = || AppError::EmptySheet(format!("{}/{}", source_stem, sheet.name));

        let Some((header_row, data_rows)) = sheet.rows.split_first() else {
            return Err(empty());
        };

        let width = sheet
            .rows
            .iter()
            .map(|row| row.len())
            .max()
            .unwrap_or(0);

        // The file's own header; empty cells become "Unnamed: <index>" placeholders.
        // A whitespace-only label is still a label and normalizes like any other.
        let mut header: Vec<String> = (0..width)
            .map(|idx| match header_row.get(idx) {
                Some(cell) if !cell.to_text().is_empty() => cell.to_text(),
                _ => format!("Unnamed: {}", idx),
            })
            .collect();

        let mut rows: Vec<Vec<CellValue>> = data_rows
            .iter()
            .filter(|row| row.iter().any(|cell| !cell.is_missing()))
            .map(|row| {
                let mut padded = row.clone();
                padded.resize(width, CellValue::Missing);
                padded
            })
            .collect();

        let keep: Vec<usize> = (0..width)
            .filter(|&idx| rows.iter().any(|row| !row[idx].is_missing()))
            .collect();
        header = keep.iter().map(|&idx| header[idx].clone()).collect();
        for row in rows.iter_mut() {
            *row = keep.iter().map(|&idx| row[idx].clone()).collect();
        }

        let mut header_promoted = false;
        if let Some(first) = rows.first() {
            let cells: Vec<String> = first.iter().map(CellValue::to_text).collect();
            if self.header_predicate.looks_like_header(&cells) {
                header = cells;
                rows.remove(0);
                header_promoted = true;
            }
        }

        let names: Vec<String> = header.iter().map(|label| normalize_column(label)).collect();
        let retained: Vec<usize> = (0..names.len())
            .filter(|&idx| !is_unnamed_placeholder(&names[idx]))
            .collect();

        if retained.is_empty() || rows.is_empty() {
            return Err(empty());
        }

        let rows: Vec<Vec<CellValue>> = rows
            .into_iter()
            .map(|row| {
                retained
                    .iter()
                    .map(|&idx| match &row[idx] {
                        CellValue::Text(text) => CellValue::Text(text.trim().to_string()),
                        other => other.clone(),
                    })
                    .collect()
            })
            .collect();

        let columns = retained
            .iter()
            .enumerate()
            .map(|(pos, &idx)| Column {
                name: names[idx].clone(),
                column_type: ColumnType::infer(rows.iter().map(|row| &row[pos])),
            })
            .collect();

        Ok(IngestedSheet {
            table_name,
            dataset: Dataset { columns, rows },
            header_promoted,
        })
    }
}
