//! Constraint resolution
//!
//! Two passes per table:
//! - [`check_header`] resolves every declared constraint against the schema and
//!   the registry before any row is scanned.
//! - [`check_column`] evaluates the constraints of one already-typed column.

use crate::descriptor::{Constraint, FieldDescriptor, Number};
use crate::error::TableError;
use crate::registry::TableRegistry;
use crate::value::Value;

/// Schema-level checks: range constraints sit on numeric columns with bounds of
/// a matching kind, and every foreign key names a loaded table and field.
pub fn check_header(
    table: &str,
    fields: &[FieldDescriptor],
    registry: &TableRegistry,
) -> Result<(), TableError> {
    for field in fields {
        for constraint in &field.constraints {
            match constraint {
                Constraint::Range { min, max } => {
                    let float_bound = matches!(min, Number::Float(_)) || matches!(max, Some(Number::Float(_)));
                    if !field.field_type.is_numeric() || (field.field_type.is_integer() && float_bound) {
                        return Err(TableError::ConstraintTypeMismatch {
                            table: table.to_string(),
                            column: field.name.clone(),
                            field_type: field.field_type,
                            constraint: constraint.to_string(),
                        });
                    }
                }
                Constraint::ForeignKey { field: ref_field, table: target } => {
                    resolve_target(table, &field.name, ref_field, target, registry)?;
                }
            }
        }
    }
    Ok(())
}

/// Evaluate every constraint of `field` over its typed column
pub fn check_column(
    table: &str,
    field: &FieldDescriptor,
    values: &[Option<Value>],
    registry: &TableRegistry,
) -> Result<(), TableError> {
    for constraint in &field.constraints {
        match constraint {
            Constraint::Range { min, max } => check_range(table, field, constraint, *min, *max, values)?,
            Constraint::ForeignKey { field: ref_field, table: target } => {
                check_foreign_key(table, field, ref_field, target, values, registry)?
            }
        }
    }
    Ok(())
}

fn check_range(
    table: &str,
    field: &FieldDescriptor,
    constraint: &Constraint,
    min: Number,
    max: Option<Number>,
    values: &[Option<Value>],
) -> Result<(), TableError> {
    for (index, value) in values.iter().enumerate() {
        let Some(value) = value else { continue };
        let number = value.as_number().ok_or_else(|| TableError::ConstraintTypeMismatch {
            table: table.to_string(),
            column: field.name.clone(),
            field_type: field.field_type,
            constraint: constraint.to_string(),
        })?;
        if !constraint.admits(number) {
            return Err(TableError::RangeViolation {
                table: table.to_string(),
                column: field.name.clone(),
                row: index + 1,
                value: value.to_string(),
                min: min.to_string(),
                max: max.map_or_else(|| "unbounded".to_string(), |m| m.to_string()),
            });
        }
    }
    Ok(())
}

fn check_foreign_key(
    table: &str,
    field: &FieldDescriptor,
    ref_field: &str,
    target: &str,
    values: &[Option<Value>],
    registry: &TableRegistry,
) -> Result<(), TableError> {
    resolve_target(table, &field.name, ref_field, target, registry)?;
    let Some(known) = registry.distinct_values(target, ref_field) else {
        return Err(unknown_field(table, &field.name, ref_field, target));
    };

    for (index, value) in values.iter().enumerate() {
        let Some(value) = value else { continue };
        if !known.contains(&value.key()) {
            return Err(TableError::ForeignKeyViolation {
                table: table.to_string(),
                column: field.name.clone(),
                row: index + 1,
                value: value.to_string(),
                ref_field: ref_field.to_string(),
                target: target.to_string(),
            });
        }
    }
    Ok(())
}

fn resolve_target(
    table: &str,
    column: &str,
    ref_field: &str,
    target: &str,
    registry: &TableRegistry,
) -> Result<(), TableError> {
    if !registry.contains(target) {
        return Err(TableError::UnknownTable {
            table: table.to_string(),
            column: column.to_string(),
            target: target.to_string(),
        });
    }
    if !registry.has_field(target, ref_field) {
        return Err(unknown_field(table, column, ref_field, target));
    }
    Ok(())
}

fn unknown_field(table: &str, column: &str, ref_field: &str, target: &str) -> TableError {
    TableError::UnknownField {
        table: table.to_string(),
        column: column.to_string(),
        field: ref_field.to_string(),
        target: target.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::registry::RegistryBuilder;
    use crate::table::RawTable;
    use crate::value::Cell;

    fn registry() -> TableRegistry {
        let mut builder = RegistryBuilder::new();
        builder
            .insert(RawTable::new(
                "Item",
                vec!["id|int32".into()],
                vec![vec![Cell::Int(1)], vec![Cell::Int(2)], vec![Cell::Int(3)]],
            ))
            .unwrap();
        builder.build()
    }

    fn field(header: &str) -> FieldDescriptor {
        FieldDescriptor::parse(header).unwrap()
    }

    fn ints(values: &[i32]) -> Vec<Option<Value>> {
        values.iter().map(|v| Some(Value::Int32(*v))).collect()
    }

    #[test]
    fn test_range_on_non_numeric_column() {
        let err = check_header("T", &[field("name|string^Range(1,5)")], &registry()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintTypeMismatch);
        let err = check_header("T", &[field("flag|bool^Range(0,2)")], &registry()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintTypeMismatch);
    }

    #[test]
    fn test_float_bounds_on_integer_column() {
        let err = check_header("T", &[field("lvl|int32^Range(0.5,5)")], &registry()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintTypeMismatch);
        assert!(check_header("T", &[field("w|float32^Range(0,5)")], &registry()).is_ok());
    }

    #[test]
    fn test_header_resolves_foreign_keys_without_rows() {
        let reg = registry();
        assert!(check_header("Recipe", &[field("itemId|int32^id(Item)")], &reg).is_ok());
        let err = check_header("Recipe", &[field("itemId|int32^id(Weapon)")], &reg).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownTable);
        let err = check_header("Recipe", &[field("itemId|int32^code(Item)")], &reg).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownField);
    }

    #[test]
    fn test_range_boundaries() {
        let reg = registry();
        let f = field("level|int32^Range(1,100)");
        assert!(check_column("Hero", &f, &ints(&[1, 50, 99]), &reg).is_ok());

        let err = check_column("Hero", &f, &ints(&[0, 50, 99]), &reg).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RangeViolation);
        assert_eq!(err.row(), Some(1));

        let err = check_column("Hero", &f, &ints(&[1, 100]), &reg).unwrap_err();
        assert_eq!(err.row(), Some(2));

        let open = field("gold|int32^Range(0,!)");
        assert!(check_column("Hero", &open, &ints(&[0, i32::MAX]), &reg).is_ok());
    }

    #[test]
    fn test_range_skips_nulls() {
        let f = field("level|int32^Range(1,100)|null");
        let values = vec![None, Some(Value::Int32(5))];
        assert!(check_column("Hero", &f, &values, &registry()).is_ok());
    }

    #[test]
    fn test_foreign_key_membership() {
        let reg = registry();
        let f = field("itemId|int32^id(Item)|null");
        assert!(check_column("Recipe", &f, &[Some(Value::Int32(2)), None], &reg).is_ok());

        let err = check_column("Recipe", &f, &ints(&[2, 4]), &reg).unwrap_err();
        match err {
            TableError::ForeignKeyViolation { row, value, ref_field, target, .. } => {
                assert_eq!(row, 2);
                assert_eq!(value, "4");
                assert_eq!(ref_field, "id");
                assert_eq!(target, "Item");
            }
            other => panic!("expected ForeignKeyViolation, got {other:?}"),
        }
    }
}
