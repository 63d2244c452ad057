//! Header text to SQL identifier normalization.
//!
//! Output is always lowercase `[a-z0-9_]` and never empty. Distinct labels may
//! normalize to the same identifier; de-duplication happens at catalog build time.

use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_COLUMN_NAME: &str = "column";
pub const DEFAULT_TABLE_NAME: &str = "table";

/// Leftovers of header cells that were blank in the source spreadsheet.
static UNNAMED_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^unnamed").unwrap());

/// Normalize a raw column label into a column identifier.
pub fn normalize_column(raw: &str) -> String {
    sanitize_identifier(raw, DEFAULT_COLUMN_NAME)
}

/// Normalize a raw label, substituting `fallback` when nothing survives.
pub fn sanitize_identifier(raw: &str, fallback: &str) -> String {
    let normalized: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();

    if normalized.is_empty() {
        fallback.to_string()
    } else {
        normalized
    }
}

/// Table name candidate for one sheet of one source file.
pub fn table_name_for(source_stem: &str, sheet_name: &str) -> String {
    sanitize_identifier(&format!("{}_{}", source_stem, sheet_name), DEFAULT_TABLE_NAME)
}

pub fn is_unnamed_placeholder(normalized: &str) -> bool {
    UNNAMED_PATTERN.is_match(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_identifier(s: &str) -> bool {
        !s.is_empty()
            && s
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    }

    #[test]
    fn test_normalize_basic_labels() {
        assert_eq!(normalize_column("Caller ID"), "caller_id");
        assert_eq!(normalize_column("  Call-Duration (sec) "), "call_duration_sec");
        assert_eq!(normalize_column("Date"), "date");
        assert_eq!(normalize_column("Unnamed: 3"), "unnamed_3");
    }

    #[test]
    fn test_normalize_falls_back_when_empty() {
        assert_eq!(normalize_column(""), DEFAULT_COLUMN_NAME);
        assert_eq!(normalize_column("   "), DEFAULT_COLUMN_NAME);
        assert_eq!(normalize_column("%%!?"), DEFAULT_COLUMN_NAME);
    }

    #[test]
    fn test_normalize_output_is_always_an_identifier() {
        let labels = [
            "Mixed Case Header",
            "Tab\tSeparated",
            "ümlaut Größe",
            "a.b/c\\d",
            "--",
            "Phone #",
            "MiXeD-case_And Spaces!",
            "\u{00a0}",
        ];
        for label in labels {
            let normalized = normalize_column(label);
            assert!(
                is_identifier(&normalized),
                "{:?} normalized to {:?}",
                label,
                normalized
            );
        }
    }

    #[test]
    fn test_normalize_tolerates_collisions() {
        assert_eq!(normalize_column("Call Date"), normalize_column("call-date"));
    }

    #[test]
    fn test_table_name_for_sheet() {
        assert_eq!(table_name_for("calls", "Sheet1"), "calls_sheet1");
        assert_eq!(
            table_name_for("Inbound Phone-Calls", "Q1 2024"),
            "inbound_phone_calls_q1_2024"
        );
    }

    #[test]
    fn test_unnamed_placeholder_detection() {
        assert!(is_unnamed_placeholder("unnamed_0"));
        assert!(is_unnamed_placeholder("unnamed"));
        assert!(!is_unnamed_placeholder("renamed_column"));
        assert!(!is_unnamed_placeholder("name"));
    }
}
