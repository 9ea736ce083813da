//! Cell and value types
//!
//! [`Cell`] is what a sheet reader hands over: loosely typed, possibly empty.
//! [`Value`] is what validation produces: exactly one variant per
//! [`FieldType`], so downstream codecs dispatch with an exhaustive `match`.

use std::fmt;

use chrono::NaiveDateTime;

use crate::descriptor::{FieldType, Number};

/// Canonical timestamp rendering used by every output codec
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A raw cell as read from a sheet
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Short description used in type mismatch reports
    pub fn describe(&self) -> String {
        match self {
            Cell::Empty => "empty cell".to_string(),
            Cell::Bool(b) => format!("boolean {b}"),
            Cell::Int(i) => format!("integer {i}"),
            Cell::Float(f) => format!("float {f:?}"),
            Cell::Text(s) => format!("text '{s}'"),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Int(i) => write!(f, "{i}"),
            Cell::Float(x) => write!(f, "{x:?}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// A validated, typed value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int32(i32),
    Int64(i64),
    Float32(f32),
    String(String),
    Bool(bool),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn field_type(&self) -> FieldType {
        match self {
            Value::Int32(_) => FieldType::Int32,
            Value::Int64(_) => FieldType::Int64,
            Value::Float32(_) => FieldType::Float32,
            Value::String(_) => FieldType::String,
            Value::Bool(_) => FieldType::Bool,
            Value::Timestamp(_) => FieldType::Timestamp,
        }
    }

    /// Numeric view for range checks
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Int32(v) => Some(Number::Int(i64::from(*v))),
            Value::Int64(v) => Some(Number::Int(*v)),
            Value::Float32(v) => Some(Number::Float(f64::from(*v))),
            Value::String(_) | Value::Bool(_) | Value::Timestamp(_) => None,
        }
    }

    /// Normalized key for foreign-key membership
    pub fn key(&self) -> ValueKey {
        match self {
            Value::Int32(v) => ValueKey::Int(i64::from(*v)),
            Value::Int64(v) => ValueKey::Int(*v),
            Value::Float32(v) => ValueKey::from_float(f64::from(*v)),
            Value::String(s) => ValueKey::Text(s.clone()),
            Value::Bool(b) => ValueKey::Bool(*b),
            Value::Timestamp(t) => ValueKey::Timestamp(*t),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Int32(v) => serde_json::Value::from(*v),
            Value::Int64(v) => serde_json::Value::from(*v),
            Value::Float32(v) => serde_json::Value::from(f64::from(*v)),
            Value::String(s) => serde_json::Value::from(s.as_str()),
            Value::Bool(b) => serde_json::Value::from(*b),
            Value::Timestamp(t) => serde_json::Value::from(t.format(TIMESTAMP_FORMAT).to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::String(s) => f.write_str(s),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Timestamp(t) => write!(f, "{}", t.format(TIMESTAMP_FORMAT)),
        }
    }
}

/// Hashable, type-normalized form of a value.
///
/// All integer widths share one key space, and integral floats collapse onto it,
/// so an `int32` column may reference an `int64` id column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKey {
    Int(i64),
    Float(u64),
    Text(String),
    Bool(bool),
    Timestamp(NaiveDateTime),
}

impl ValueKey {
    pub fn from_float(f: f64) -> Self {
        if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
            return ValueKey::Int(f as i64);
        }
        ValueKey::Float(f.to_bits())
    }
}

/// One validated row, in schema column order. `None` is an explicit null.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row(pub Vec<Option<Value>>);

impl Row {
    pub fn values(&self) -> &[Option<Value>] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Option<Value>>> for Row {
    fn from(values: Vec<Option<Value>>) -> Self {
        Row(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_integer_keys_share_space() {
        assert_eq!(Value::Int32(7).key(), Value::Int64(7).key());
        assert_eq!(Value::Float32(7.0).key(), Value::Int64(7).key());
        assert_ne!(Value::Float32(7.5).key(), Value::Int64(7).key());
        assert_ne!(Value::String("7".into()).key(), Value::Int32(7).key());
    }

    #[test]
    fn test_timestamp_rendering() {
        let t = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_opt(8, 5, 0)
            .unwrap();
        let value = Value::Timestamp(t);
        assert_eq!(value.to_string(), "2024-02-29 08:05:00");
        assert_eq!(value.to_json(), serde_json::json!("2024-02-29 08:05:00"));
    }

    #[test]
    fn test_as_number() {
        assert_eq!(Value::Int32(-3).as_number(), Some(Number::Int(-3)));
        assert_eq!(Value::Float32(0.5).as_number(), Some(Number::Float(0.5)));
        assert_eq!(Value::Bool(true).as_number(), None);
    }

    #[test]
    fn test_cell_describe() {
        assert_eq!(Cell::Text("abc".into()).describe(), "text 'abc'");
        assert_eq!(Cell::Float(2.0).describe(), "float 2.0");
        assert!(Cell::Empty.is_empty());
    }
}
