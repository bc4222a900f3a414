/*
 * row.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Row data and the column whitelist.
//!
//! A [`Row`] stores cells under *flattened* keys: the table-qualified column
//! name with every `.` replaced by `_` (`users.name` is stored as
//! `users_name`). [`ValidColumns`] holds the qualified names a template is
//! allowed to read. A column missing from the whitelist is never read, even
//! when the row carries it.

use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::value::Value;

/// Flatten a qualified column name into its row key.
pub fn flatten_key(column: &str) -> String {
    column.replace('.', "_")
}

/// One record being rendered, keyed by flattened column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: IndexMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a cell. Dotted names are flattened.
    pub fn insert(&mut self, column: &str, value: impl Into<Value>) {
        self.cells.insert(flatten_key(column), value.into());
    }

    /// Builder-style [`Row::insert`].
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Look up a cell by qualified or flattened column name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells.get(&flatten_key(column))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterate cells in insertion order as `(flattened key, value)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Build a row from a JSON object.
    ///
    /// Nested objects flatten into `outer_inner` keys, so both
    /// `{"users.name": "a"}` and `{"users": {"name": "a"}}` produce
    /// `users_name`. Returns `None` when `json` is not an object.
    pub fn from_json(json: &serde_json::Value) -> Option<Row> {
        let object = json.as_object()?;
        let mut row = Row::new();
        for (key, value) in object {
            row.insert_json(&flatten_key(key), value);
        }
        Some(row)
    }

    fn insert_json(&mut self, key: &str, value: &serde_json::Value) {
        match value {
            serde_json::Value::Object(inner) => {
                for (k, v) in inner {
                    self.insert_json(&format!("{}_{}", key, flatten_key(k)), v);
                }
            }
            other => {
                self.cells.insert(key.to_string(), Value::from(other));
            }
        }
    }
}

impl<K: AsRef<str>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.insert(k.as_ref(), v);
        }
        row
    }
}

/// Qualified column names a template may substitute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidColumns {
    names: BTreeSet<String>,
}

impl ValidColumns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>) {
        self.names.insert(column.into());
    }

    pub fn contains(&self, column: &str) -> bool {
        self.names.contains(column)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ValidColumns {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        ValidColumns {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flattened_storage() {
        let row = Row::new().with("users.name", "Alice");
        assert_eq!(row.get("users.name"), Some(&Value::string("Alice")));
        assert_eq!(row.get("users_name"), Some(&Value::string("Alice")));
        assert_eq!(row.iter().next().map(|(k, _)| k), Some("users_name"));
    }

    #[test]
    fn test_from_json_flattens_nested_objects() {
        let row = Row::from_json(&json!({
            "users": {"name": "Bob", "age": 41},
            "orders.total": 12.5,
            "deleted_at": null
        }))
        .unwrap();

        assert_eq!(row.get("users.name"), Some(&Value::string("Bob")));
        assert_eq!(row.get("users.age"), Some(&Value::Int(41)));
        assert_eq!(row.get("orders.total"), Some(&Value::Float(12.5)));
        assert_eq!(row.get("deleted_at"), Some(&Value::Null));
    }

    #[test]
    fn test_from_json_rejects_non_objects() {
        assert!(Row::from_json(&json!([1, 2])).is_none());
    }

    #[test]
    fn test_valid_columns() {
        let cols: ValidColumns = ["users.name", "users.email"].into_iter().collect();
        assert!(cols.contains("users.name"));
        assert!(!cols.contains("users_name"));
        assert_eq!(cols.len(), 2);
    }
}
