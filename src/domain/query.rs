use serde::Serialize;

/// SQL text that has passed the read-only guard.
///
/// Only `SqlGuard::validate` constructs this, so the executor never sees unchecked text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuery {
    sql: String,
}

impl ValidatedQuery {
    pub(crate) fn new(sql: String) -> Self {
        Self { sql }
    }

    pub fn as_str(&self) -> &str {
        &self.sql
    }
}

/// The two ways a user can ask for a report. Both end at the same guard and executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryRequest {
    Question(String),
    Sql(String),
}

/// Materialized output of one query, owned by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl ResultSet {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn preview(&self, limit: usize) -> &[Vec<serde_json::Value>] {
        &self.rows[..self.rows.len().min(limit)]
    }
}

/// Cell rendering shared by the CSV artifact and the terminal preview.
pub fn value_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_preview_is_bounded() {
        let result = ResultSet {
            columns: vec!["n".to_string()],
            rows: (0..5).map(|i| vec![json!(i)]).collect(),
        };
        assert_eq!(result.preview(3).len(), 3);
        assert_eq!(result.preview(10).len(), 5);
    }

    #[test]
    fn test_value_to_text() {
        assert_eq!(value_to_text(&json!(null)), "");
        assert_eq!(value_to_text(&json!("a b")), "a b");
        assert_eq!(value_to_text(&json!(3)), "3");
        assert_eq!(value_to_text(&json!(true)), "true");
    }
}
