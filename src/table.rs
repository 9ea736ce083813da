//! Raw and validated tables

use crate::descriptor::{header_name, FieldDescriptor};
use crate::value::{Cell, Row, Value};

/// A sheet as handed over by a reader: raw header strings and loose cells.
///
/// Construction applies the blank-row rule: the first row whose cells are all
/// empty ends the table, and everything after it is dropped. Short rows are
/// padded with [`Cell::Empty`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .take_while(|row| !row.iter().all(Cell::is_empty))
            .map(|mut row| {
                if row.len() < width {
                    row.resize(width, Cell::Empty);
                }
                row
            })
            .collect();

        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cells of one column, top to bottom
    pub fn column(&self, index: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(index).unwrap_or(&Cell::Empty))
    }

    /// Position of the column whose header names `field`
    pub fn find_column(&self, field: &str) -> Option<usize> {
        self.headers.iter().position(|h| header_name(h) == field)
    }
}

/// A validated table: parsed schema plus typed rows
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            fields,
            rows,
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Value of `column` in `row` (0-based), `None` for nulls and unknown columns
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::FieldType;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_blank_row_terminates_table() {
        let raw = RawTable::new(
            "Item",
            headers(&["id|int32", "name|string"]),
            vec![
                vec![Cell::Int(1), Cell::Text("a".into())],
                vec![Cell::Empty, Cell::Empty],
                vec![Cell::Int(3), Cell::Text("c".into())],
            ],
        );
        assert_eq!(raw.row_count(), 1);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let raw = RawTable::new(
            "Item",
            headers(&["id|int32", "name|string|null"]),
            vec![vec![Cell::Int(1)]],
        );
        assert_eq!(raw.rows()[0], vec![Cell::Int(1), Cell::Empty]);
        assert_eq!(raw.column(1).collect::<Vec<_>>(), vec![&Cell::Empty]);
    }

    #[test]
    fn test_find_column_by_header_name() {
        let raw = RawTable::new("Item", headers(&["id|int32^Range(0,!)", "name|string"]), vec![]);
        assert_eq!(raw.find_column("id"), Some(0));
        assert_eq!(raw.find_column("name"), Some(1));
        assert_eq!(raw.find_column("missing"), None);
    }

    #[test]
    fn test_value_lookup_by_name() {
        let table = Table::new(
            "Item",
            vec![
                FieldDescriptor::new("id", FieldType::Int32),
                FieldDescriptor::new("note", FieldType::String).nullable(),
            ],
            vec![Row(vec![Some(Value::Int32(4)), None])],
        );
        assert_eq!(table.value(0, "id"), Some(&Value::Int32(4)));
        assert_eq!(table.value(0, "note"), None);
        assert_eq!(table.value(1, "id"), None);
    }
}
