use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    pub table_name: String,
    pub columns: Vec<ColumnSchema>,
}

/// Structural description of the catalog handed to the language model.
/// Holds names and engine types only, never cell values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaDescription {
    pub tables: Vec<TableSchema>,
}

impl SchemaDescription {
    pub fn push(&mut self, table: TableSchema) {
        self.tables.push(table);
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.table_name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Renders the plain-text block embedded in the model prompt:
    ///
    /// ```text
    /// Table: <table_name>
    ///   - <column_name> (<engine_type>)
    /// ```
    pub fn render(&self) -> String {
        let mut lines = Vec::new();

        for table in &self.tables {
            lines.push(format!("Table: {}", table.table_name));
            for column in &table.columns {
                lines.push(format!("  - {} ({})", column.name, column.data_type));
            }
        }

        lines.join("\n")
    }
}

impl fmt::Display for SchemaDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, data_type: &str) -> ColumnSchema {
        ColumnSchema {
            name: name.to_string(),
            data_type: data_type.to_string(),
        }
    }

    #[test]
    fn test_render_wire_format() {
        let mut schema = SchemaDescription::default();
        schema.push(TableSchema {
            table_name: "calls_sheet1".to_string(),
            columns: vec![column("date", "TIMESTAMP"), column("duration", "BIGINT")],
        });
        schema.push(TableSchema {
            table_name: "agents_sheet1".to_string(),
            columns: vec![column("name", "VARCHAR")],
        });

        assert_eq!(
            schema.render(),
            "Table: calls_sheet1\n  - date (TIMESTAMP)\n  - duration (BIGINT)\nTable: agents_sheet1\n  - name (VARCHAR)"
        );
    }

    #[test]
    fn test_render_empty_schema() {
        let schema = SchemaDescription::default();
        assert!(schema.is_empty());
        assert_eq!(schema.render(), "");
    }
}
