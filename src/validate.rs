//! Type and nullability validation
//!
//! Converts raw cells into typed [`Value`]s according to a column's
//! [`FieldDescriptor`]. An absent cell is null when the column is nullable,
//! except in `bool` columns where it always becomes `false`.

use chrono::{NaiveDate, NaiveDateTime};

use crate::descriptor::{FieldDescriptor, FieldType};
use crate::error::TableError;
use crate::value::{Cell, Value};

/// A single-cell failure, before table/column/row context is attached
#[derive(Debug, Clone, PartialEq)]
pub enum CellError {
    NullNotAllowed,
    TypeMismatch { expected: FieldType, actual: String },
    InvalidBool { value: String },
    InvalidTimestamp { value: String },
}

impl CellError {
    /// Attach location; `row` counts data rows from 1
    pub fn at(self, table: &str, column: &str, row: usize) -> TableError {
        let table = table.to_string();
        let column = column.to_string();
        match self {
            CellError::NullNotAllowed => TableError::NullNotAllowed { table, column, row },
            CellError::TypeMismatch { expected, actual } => TableError::TypeMismatch {
                table,
                column,
                row,
                expected,
                actual,
            },
            CellError::InvalidBool { value } => TableError::InvalidBool { table, column, row, value },
            CellError::InvalidTimestamp { value } => TableError::InvalidTimestamp { table, column, row, value },
        }
    }
}

/// Validate one cell against its column descriptor
pub fn coerce_cell(field: &FieldDescriptor, cell: &Cell) -> Result<Option<Value>, CellError> {
    if cell.is_empty() {
        return match field.field_type {
            FieldType::Bool => Ok(Some(Value::Bool(false))),
            _ if field.nullable => Ok(None),
            _ => Err(CellError::NullNotAllowed),
        };
    }
    coerce_value(field.field_type, cell).map(Some)
}

/// Convert a non-empty cell to `field_type`
pub fn coerce_value(field_type: FieldType, cell: &Cell) -> Result<Value, CellError> {
    let mismatch = || CellError::TypeMismatch {
        expected: field_type,
        actual: cell.describe(),
    };

    match field_type {
        FieldType::Int32 => integral(cell)
            .and_then(|i| i32::try_from(i).ok())
            .map(Value::Int32)
            .ok_or_else(mismatch),
        FieldType::Int64 => integral(cell).map(Value::Int64).ok_or_else(mismatch),
        FieldType::Float32 => match cell {
            Cell::Int(i) => Ok(Value::Float32(*i as f32)),
            Cell::Float(f) if f.is_finite() && f.abs() <= f64::from(f32::MAX) => Ok(Value::Float32(*f as f32)),
            _ => Err(mismatch()),
        },
        FieldType::String => match cell {
            Cell::Text(s) => Ok(Value::String(s.clone())),
            other => Ok(Value::String(other.to_string())),
        },
        FieldType::Bool => match cell {
            Cell::Bool(b) => Ok(Value::Bool(*b)),
            Cell::Int(0) => Ok(Value::Bool(false)),
            Cell::Int(1) => Ok(Value::Bool(true)),
            Cell::Float(f) if *f == 0.0 || *f == 1.0 => Ok(Value::Bool(*f == 1.0)),
            Cell::Text(s) if s.trim().eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Cell::Text(s) if s.trim().eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            other => Err(CellError::InvalidBool { value: other.describe() }),
        },
        FieldType::Timestamp => match cell {
            Cell::Text(s) => parse_timestamp(s)
                .map(Value::Timestamp)
                .ok_or_else(|| CellError::InvalidTimestamp { value: s.clone() }),
            _ => Err(mismatch()),
        },
    }
}

/// Parse `year-month-day-hour-minute-second` into a calendar date-time
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let parts: Vec<&str> = text.trim().split('-').collect();
    if parts.len() != 6 {
        return None;
    }
    let year: i32 = parts[0].trim().parse().ok()?;
    // four-digit years only, so the canonical rendering stays YYYY-MM-DD
    if !(1..=9999).contains(&year) {
        return None;
    }
    let mut rest = [0u32; 5];
    for (slot, part) in rest.iter_mut().zip(&parts[1..]) {
        *slot = part.trim().parse().ok()?;
    }
    let [month, day, hour, minute, second] = rest;
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
}

/// Validate every cell of one column, failing on the first bad cell
pub fn validate_column<'a>(
    table: &str,
    field: &FieldDescriptor,
    cells: impl IntoIterator<Item = &'a Cell>,
) -> Result<Vec<Option<Value>>, TableError> {
    cells
        .into_iter()
        .enumerate()
        .map(|(index, cell)| coerce_cell(field, cell).map_err(|e| e.at(table, &field.name, index + 1)))
        .collect()
}

/// Integer cells, and floats with no fractional part (sheet readers often
/// report whole numbers as floats)
fn integral(cell: &Cell) -> Option<i64> {
    match cell {
        Cell::Int(i) => Some(*i),
        Cell::Float(f) if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 => Some(*f as i64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn field(header: &str) -> FieldDescriptor {
        FieldDescriptor::parse(header).unwrap()
    }

    #[test]
    fn test_int32_bounds() {
        let f = field("a|int32");
        assert_eq!(coerce_cell(&f, &Cell::Int(2_147_483_647)), Ok(Some(Value::Int32(i32::MAX))));
        assert_eq!(coerce_cell(&f, &Cell::Int(-2_147_483_648)), Ok(Some(Value::Int32(i32::MIN))));
        assert!(matches!(
            coerce_cell(&f, &Cell::Int(2_147_483_648)),
            Err(CellError::TypeMismatch { expected: FieldType::Int32, .. })
        ));
        assert_eq!(coerce_cell(&f, &Cell::Float(3.0)), Ok(Some(Value::Int32(3))));
        assert!(coerce_cell(&f, &Cell::Float(3.5)).is_err());
        assert!(coerce_cell(&f, &Cell::Text("3".into())).is_err());
    }

    #[test]
    fn test_int64_and_float32() {
        assert_eq!(
            coerce_cell(&field("a|int64"), &Cell::Int(i64::MAX)),
            Ok(Some(Value::Int64(i64::MAX)))
        );
        let f = field("a|float32");
        assert_eq!(coerce_cell(&f, &Cell::Int(2)), Ok(Some(Value::Float32(2.0))));
        assert_eq!(coerce_cell(&f, &Cell::Float(0.25)), Ok(Some(Value::Float32(0.25))));
        assert!(coerce_cell(&f, &Cell::Float(f64::NAN)).is_err());
        assert!(coerce_cell(&f, &Cell::Float(1e300)).is_err());
        assert!(coerce_cell(&f, &Cell::Bool(true)).is_err());
    }

    #[test]
    fn test_string_accepts_anything() {
        let f = field("a|string");
        assert_eq!(coerce_cell(&f, &Cell::Int(12)), Ok(Some(Value::String("12".into()))));
        assert_eq!(coerce_cell(&f, &Cell::Bool(true)), Ok(Some(Value::String("true".into()))));
        assert_eq!(coerce_cell(&f, &Cell::Text("hi".into())), Ok(Some(Value::String("hi".into()))));
    }

    #[test]
    fn test_bool_forms() {
        let f = field("a|bool");
        assert_eq!(coerce_cell(&f, &Cell::Bool(true)), Ok(Some(Value::Bool(true))));
        assert_eq!(coerce_cell(&f, &Cell::Int(0)), Ok(Some(Value::Bool(false))));
        assert_eq!(coerce_cell(&f, &Cell::Float(1.0)), Ok(Some(Value::Bool(true))));
        assert_eq!(coerce_cell(&f, &Cell::Text("TRUE".into())), Ok(Some(Value::Bool(true))));
        assert_eq!(coerce_cell(&f, &Cell::Text("False".into())), Ok(Some(Value::Bool(false))));
        assert!(matches!(coerce_cell(&f, &Cell::Int(2)), Err(CellError::InvalidBool { .. })));
        assert!(matches!(coerce_cell(&f, &Cell::Text("yes".into())), Err(CellError::InvalidBool { .. })));
    }

    #[test]
    fn test_absent_bool_is_false_regardless_of_flag() {
        assert_eq!(coerce_cell(&field("a|bool"), &Cell::Empty), Ok(Some(Value::Bool(false))));
        assert_eq!(coerce_cell(&field("a|bool|null"), &Cell::Empty), Ok(Some(Value::Bool(false))));
    }

    #[test]
    fn test_null_policy() {
        assert_eq!(coerce_cell(&field("a|int32|null"), &Cell::Empty), Ok(None));
        assert_eq!(coerce_cell(&field("a|int32"), &Cell::Empty), Err(CellError::NullNotAllowed));
        assert_eq!(coerce_cell(&field("a|string"), &Cell::Empty), Err(CellError::NullNotAllowed));
    }

    #[test]
    fn test_timestamps() {
        let f = field("a|timestamp");
        let value = coerce_cell(&f, &Cell::Text("2024-2-29-23-59-59".into())).unwrap().unwrap();
        assert_eq!(value.to_string(), "2024-02-29 23:59:59");

        for bad in ["2023-2-29-0-0-0", "2024-01-01", "2024-1-1-24-0-0", "2024-1-x-0-0-0", "2024-01-01 00:00:00"] {
            assert!(
                matches!(coerce_cell(&f, &Cell::Text(bad.into())), Err(CellError::InvalidTimestamp { .. })),
                "{bad}"
            );
        }
        assert!(matches!(coerce_cell(&f, &Cell::Int(5)), Err(CellError::TypeMismatch { .. })));
    }

    #[test]
    fn test_timestamp_years_are_four_digits() {
        assert!(parse_timestamp("1-1-1-0-0-0").is_some());
        assert_eq!(
            parse_timestamp("9999-12-31-23-59-59").unwrap().format(crate::value::TIMESTAMP_FORMAT).to_string(),
            "9999-12-31 23:59:59"
        );
        for bad in ["10000-1-1-0-0-0", "0-1-1-0-0-0", "-5-1-1-0-0-0"] {
            assert!(parse_timestamp(bad).is_none(), "{bad}");
        }
    }

    #[test]
    fn test_validate_column_reports_first_row() {
        let f = field("hp|int32");
        let cells = [Cell::Int(1), Cell::Text("x".into()), Cell::Empty];
        let err = validate_column("Hero", &f, &cells).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(err.row(), Some(2));
        assert_eq!(err.table(), "Hero");
    }
}
