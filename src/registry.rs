//! Table Registry
//!
//! Every sheet of a compilation run is loaded into a [`RegistryBuilder`] first.
//! [`RegistryBuilder::build`] freezes it into a [`TableRegistry`], the read-only
//! snapshot that foreign-key checks resolve against. Because the snapshot is
//! complete before any table is validated, the result of a foreign-key check
//! never depends on the order tables are processed in, and the registry can be
//! shared by reference across worker threads.

use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use crate::descriptor::FieldDescriptor;
use crate::error::{Error, Result};
use crate::table::RawTable;
use crate::validate::coerce_value;
use crate::value::{Cell, ValueKey};

/// Write phase of the registry
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    tables: BTreeMap<String, RawTable>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table. Table names must be unique within a run.
    pub fn insert(&mut self, table: RawTable) -> Result<()> {
        if self.tables.contains_key(table.name()) {
            return Err(Error::DuplicateTable {
                name: table.name().to_string(),
            });
        }
        self.tables.insert(table.name().to_string(), table);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Freeze the registry
    pub fn build(self) -> TableRegistry {
        let tables = self
            .tables
            .into_iter()
            .map(|(name, raw)| (name, RegisteredTable::new(raw)))
            .collect();
        TableRegistry { tables }
    }
}

/// One loaded sheet plus lazily computed distinct-value sets per column
#[derive(Debug)]
struct RegisteredTable {
    raw: RawTable,
    /// Parsed headers; `None` where the header does not parse
    fields: Vec<Option<FieldDescriptor>>,
    distinct: Vec<OnceLock<HashSet<ValueKey>>>,
}

impl RegisteredTable {
    fn new(raw: RawTable) -> Self {
        let fields = raw
            .headers()
            .iter()
            .map(|h| FieldDescriptor::parse(h).ok())
            .collect();
        let distinct = raw.headers().iter().map(|_| OnceLock::new()).collect();
        Self { raw, fields, distinct }
    }

    fn distinct_values(&self, column: usize) -> &HashSet<ValueKey> {
        self.distinct[column].get_or_init(|| {
            let declared = self.fields[column].as_ref().map(|f| f.field_type);
            self.raw
                .column(column)
                .filter(|cell| !cell.is_empty())
                .filter_map(|cell| match declared {
                    Some(field_type) => coerce_value(field_type, cell).ok().map(|v| v.key()),
                    None => loose_key(cell),
                })
                .collect()
        })
    }
}

/// Read-only snapshot of every table loaded in one run
#[derive(Debug)]
pub struct TableRegistry {
    tables: BTreeMap<String, RegisteredTable>,
}

impl TableRegistry {
    pub fn get(&self, name: &str) -> Option<&RawTable> {
        self.tables.get(name).map(|t| &t.raw)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Whether `table` has a column named `field`
    pub fn has_field(&self, table: &str, field: &str) -> bool {
        self.get(table)
            .map(|t| t.find_column(field).is_some())
            .unwrap_or(false)
    }

    /// Distinct non-empty values of `table.field`, coerced with the column's
    /// declared type. `None` if the table or field does not exist.
    pub fn distinct_values(&self, table: &str, field: &str) -> Option<&HashSet<ValueKey>> {
        let entry = self.tables.get(table)?;
        let column = entry.raw.find_column(field)?;
        Some(entry.distinct_values(column))
    }

    /// Table names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Tables in name order
    pub fn tables(&self) -> impl Iterator<Item = &RawTable> {
        self.tables.values().map(|t| &t.raw)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Key for a cell whose column header does not parse
fn loose_key(cell: &Cell) -> Option<ValueKey> {
    match cell {
        Cell::Empty => None,
        Cell::Bool(b) => Some(ValueKey::Bool(*b)),
        Cell::Int(i) => Some(ValueKey::Int(*i)),
        Cell::Float(f) => Some(ValueKey::from_float(*f)),
        Cell::Text(s) => Some(ValueKey::Text(s.clone())),
    }
}
