//! Command implementations for the tessera CLI
//!
//! Each command module handles the CLI interface and delegates to
//! tessera-template for the actual rendering.

pub mod check;
pub mod render;

use std::path::Path;

use anyhow::{Context, Result};
use tessera_template::{Row, ValidColumns};

/// Read a template file.
pub(crate) fn read_template(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read template {}", path.display()))
}

/// Collect qualified column names (`users.name`) from a JSON object.
fn json_columns(prefix: Option<&str>, json: &serde_json::Value, out: &mut ValidColumns) {
    let Some(object) = json.as_object() else {
        return;
    };
    for (key, value) in object {
        let name = match prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key.clone(),
        };
        if value.is_object() {
            json_columns(Some(&name), value, out);
        } else {
            out.insert(name);
        }
    }
}

/// Parse rows from JSON text: either one object or an array of objects.
///
/// Returns the rows and every column name that appears in them.
pub fn parse_rows(content: &str) -> Result<(Vec<Row>, ValidColumns)> {
    let json: serde_json::Value =
        serde_json::from_str(content).context("Rows must be valid JSON")?;
    let items = match json {
        serde_json::Value::Array(items) => items,
        other => vec![other],
    };

    let mut columns = ValidColumns::new();
    let mut rows = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let row = Row::from_json(item)
            .with_context(|| format!("Row {} is not a JSON object", i + 1))?;
        json_columns(None, item, &mut columns);
        rows.push(row);
    }
    Ok((rows, columns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_template::Value;

    #[test]
    fn test_parse_rows() {
        let (rows, columns) =
            parse_rows(r#"[{"users": {"name": "Ada"}, "n": 1}, {"users.name": "Bo"}]"#).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("users.name"), Some(&Value::string("Ada")));
        assert_eq!(rows[1].get("users.name"), Some(&Value::string("Bo")));
        assert!(columns.contains("users.name"));
        assert!(columns.contains("n"));
        assert_eq!(columns.len(), 2);
    }

    #[test]
    fn test_parse_single_row() {
        let (rows, _) = parse_rows(r#"{"a": true}"#).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(parse_rows("[1, 2]").is_err());
        assert!(parse_rows("not json").is_err());
    }
}
