/*
 * value.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Scalar values flowing through the engine.
//!
//! Row cells, call arguments and call results all share [`Value`]. A
//! collaborator may also hand back an [`Value::Object`], which only exists so
//! that the second link of a call chain has something to be invoked on.

use std::fmt;
use std::sync::Arc;

use crate::dispatch::Collaborator;

/// A value that can appear in a row or be passed to and from collaborators.
#[derive(Clone, Default)]
pub enum Value {
    /// A null/missing value.
    #[default]
    Null,

    /// A boolean value.
    Bool(bool),

    /// An integer value.
    Int(i64),

    /// A floating point value.
    Float(f64),

    /// A string value.
    String(String),

    /// A list of values (bracketed call arguments, JSON arrays).
    List(Vec<Value>),

    /// A collaborator handle returned by a call.
    Object(Arc<dyn Collaborator>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null or empty string, the condition evaluator's notion of "null".
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Numeric interpretation of this value.
    ///
    /// Strings count as numeric when their trimmed text parses as a finite
    /// number (`"10"`, `"-2.5"`, `" 3 "`).
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) if f.is_finite() => Some(*f),
            Value::String(s) => parse_number(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Render this value as text for substitution.
    ///
    /// - Bool: "1" or "" (empty for false)
    /// - Float: shortest form, integral floats without a fraction
    /// - List and Object: ""
    /// - Null: ""
    pub fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(true) => "1".to_string(),
            Value::Bool(false) => String::new(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_number(*f),
            Value::String(s) => s.clone(),
            Value::List(_) | Value::Object(_) => String::new(),
        }
    }

    /// Loose equality: numeric when both sides are numeric, textual otherwise.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => self.render() == other.render(),
        }
    }

    /// Classify a bare literal: integers and floats become numbers,
    /// everything else stays a string.
    pub fn from_literal(text: &str) -> Value {
        if let Ok(i) = text.parse::<i64>() {
            return Value::Int(i);
        }
        match parse_number(text) {
            Some(f) if text.trim() == text => Value::Float(f),
            _ => Value::String(text.to_string()),
        }
    }
}

/// Parse a number the way numeric-string detection expects.
pub(crate) fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    // `f64::from_str` accepts "inf" and "NaN"; those are not numeric strings.
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
    {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Format a number without a trailing `.0` for integral values.
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Value::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Object(obj) => f.debug_tuple("Object").field(&obj.name()).finish(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Null, Value::Float),
            },
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => Value::List(items.iter().map(Value::from).collect()),
            // Nested objects are flattened by `Row::from_json`; a stray one
            // carries no scalar meaning.
            serde_json::Value::Object(_) => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_strings() {
        assert_eq!(Value::string("10").as_number(), Some(10.0));
        assert_eq!(Value::string(" -2.5 ").as_number(), Some(-2.5));
        assert_eq!(Value::string("abc").as_number(), None);
        assert_eq!(Value::string("inf").as_number(), None);
        assert_eq!(Value::string("").as_number(), None);
        assert_eq!(Value::Null.as_number(), None);
    }

    #[test]
    fn test_render() {
        assert_eq!(Value::Float(20.0).render(), "20");
        assert_eq!(Value::Float(2.5).render(), "2.5");
        assert_eq!(Value::Bool(true).render(), "1");
        assert_eq!(Value::Bool(false).render(), "");
        assert_eq!(Value::List(vec![Value::Int(1)]).render(), "");
        assert_eq!(Value::Null.render(), "");
    }

    #[test]
    fn test_loose_eq() {
        assert!(Value::string("1").loose_eq(&Value::Int(1)));
        assert!(Value::string("1.0").loose_eq(&Value::string("1")));
        assert!(Value::Null.loose_eq(&Value::string("")));
        assert!(!Value::string("abc").loose_eq(&Value::string("ABC")));
    }

    #[test]
    fn test_from_literal() {
        assert_eq!(Value::from_literal("42"), Value::Int(42));
        assert_eq!(Value::from_literal("4.5"), Value::Float(4.5));
        assert_eq!(Value::from_literal("Active"), Value::string("Active"));
        assert_eq!(Value::from_literal(" 42"), Value::string(" 42"));
    }
}
