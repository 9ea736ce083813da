//! Validation and compile driver
//!
//! [`validate_table`] is the per-table sequence: header parse, header-level
//! constraint resolution, type and null checks over every column, then
//! constraint checks over every column. The first failure aborts the table.
//!
//! [`Compiler`] wraps that sequence in a run: load every sheet, freeze the
//! registry, validate and emit each table (on the rayon pool when enabled),
//! write artifacts and the manifest, and collect a [`RunReport`]. A failed
//! table never stops its siblings; whether it fails the run is a config choice.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::checksum::Checksum;
use crate::config::CompilerConfig;
use crate::constraint;
use crate::descriptor::FieldDescriptor;
use crate::emit::{BinaryEmitter, Emitter, ProtoEmitter};
use crate::error::{Error, Result, TableError};
use crate::manifest::{self, ArtifactEntry, FailureEntry, Manifest, TableEntry};
use crate::registry::{RegistryBuilder, TableRegistry};
use crate::source;
use crate::table::{RawTable, Table};
use crate::validate;
use crate::value::{Row, Value};

/// Parse every header of `raw`, rejecting duplicate field names
pub fn parse_header(raw: &RawTable) -> std::result::Result<Vec<FieldDescriptor>, TableError> {
    let mut seen = HashSet::new();
    let mut fields = Vec::with_capacity(raw.headers().len());

    for (index, header) in raw.headers().iter().enumerate() {
        let field = FieldDescriptor::parse(header).map_err(|source| TableError::Header {
            table: raw.name().to_string(),
            index,
            header: header.clone(),
            source,
        })?;
        if !seen.insert(field.name.clone()) {
            return Err(TableError::DuplicateField {
                table: raw.name().to_string(),
                column: field.name,
                index,
            });
        }
        fields.push(field);
    }
    Ok(fields)
}

/// Validate one raw table against the frozen registry
pub fn validate_table(raw: &RawTable, registry: &TableRegistry) -> std::result::Result<Table, TableError> {
    let name = raw.name();
    let fields = parse_header(raw)?;
    constraint::check_header(name, &fields, registry)?;

    let columns = fields
        .iter()
        .enumerate()
        .map(|(index, field)| validate::validate_column(name, field, raw.column(index)))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    for (field, values) in fields.iter().zip(&columns) {
        constraint::check_column(name, field, values, registry)?;
    }

    Ok(Table::new(name, fields, transpose(columns, raw.row_count())))
}

fn transpose(columns: Vec<Vec<Option<Value>>>, row_count: usize) -> Vec<Row> {
    let mut rows: Vec<Vec<Option<Value>>> = (0..row_count)
        .map(|_| Vec::with_capacity(columns.len()))
        .collect();
    for column in columns {
        for (row, value) in rows.iter_mut().zip(column) {
            row.push(value);
        }
    }
    rows.into_iter().map(Row).collect()
}

/// Result of compiling one table
#[derive(Debug)]
pub struct TableOutcome {
    pub name: String,
    pub result: Result<TableEntry>,
}

impl TableOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Everything a run produced
#[derive(Debug)]
pub struct RunReport {
    /// Sorted by table name
    pub outcomes: Vec<TableOutcome>,
    pub manifest: Manifest,
    pub manifest_path: PathBuf,
}

impl RunReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &TableEntry> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.name.as_str(), e)))
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(TableOutcome::is_success)
    }
}

/// Compiles a directory of sheets into artifacts
pub struct Compiler {
    config: CompilerConfig,
    emitters: Vec<(Box<dyn Emitter>, PathBuf)>,
}

impl Compiler {
    /// Build a compiler with the emitters enabled in `config`
    pub fn new(config: CompilerConfig) -> Self {
        let mut compiler = Self {
            emitters: Vec::new(),
            config,
        };
        if compiler.config.emit.binary {
            let dir = compiler.config.output.dat_dir.clone();
            compiler = compiler.with_emitter(BinaryEmitter, dir);
        }
        if compiler.config.emit.proto {
            let dir = compiler.config.output.proto_dir.clone();
            compiler = compiler.with_emitter(ProtoEmitter, dir);
        }
        compiler
    }

    /// Add an emitter writing into `dir`
    pub fn with_emitter(mut self, emitter: impl Emitter + 'static, dir: impl Into<PathBuf>) -> Self {
        self.emitters.push((Box::new(emitter), dir.into()));
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn run(&self) -> Result<RunReport> {
        self.prepare_output()?;

        let mut outcomes = Vec::new();
        let registry = self.load(&mut outcomes)?;
        info!("Loaded {} table(s) from {}", registry.len(), self.config.input.dir.display());

        let manifest_path = self.config.manifest_path();
        let manifest_dir = manifest_path.parent().unwrap_or(Path::new(".")).to_path_buf();

        let compile = |raw: &&RawTable| TableOutcome {
            name: raw.name().to_string(),
            result: self.compile_table(raw, &registry, &manifest_dir),
        };
        let tables: Vec<&RawTable> = registry.tables().collect();
        if self.config.run.parallel {
            outcomes.par_extend(tables.par_iter().map(compile));
        } else {
            outcomes.extend(tables.iter().map(compile));
        }
        outcomes.sort_by(|a, b| a.name.cmp(&b.name));

        let mut entries = Vec::new();
        let mut failures = Vec::new();
        for outcome in &outcomes {
            match &outcome.result {
                Ok(entry) => entries.push(entry.clone()),
                Err(err) => {
                    warn!("Table '{}' failed: {}", outcome.name, err);
                    failures.push(FailureEntry {
                        table: outcome.name.clone(),
                        code: err.code().to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        let manifest = Manifest::new(entries, failures);
        manifest.save(&manifest_path)?;
        info!("Wrote manifest {}", manifest_path.display());

        if !self.config.run.continue_on_error && !manifest.failures.is_empty() {
            return Err(Error::RunFailed {
                failed: manifest.failures.iter().map(|f| f.table.clone()).collect(),
            });
        }

        Ok(RunReport {
            outcomes,
            manifest,
            manifest_path,
        })
    }

    fn prepare_output(&self) -> Result<()> {
        let mut dirs: Vec<&Path> = self.emitters.iter().map(|(_, dir)| dir.as_path()).collect();
        dirs.push(&self.config.output.dat_dir);
        dirs.sort();
        dirs.dedup();

        for dir in dirs {
            if self.config.output.clean && dir.exists() {
                debug!("Cleaning {}", dir.display());
                fs::remove_dir_all(dir)?;
            }
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Read every sheet into a frozen registry. Sheets that cannot be read
    /// become failed outcomes.
    fn load(&self, outcomes: &mut Vec<TableOutcome>) -> Result<TableRegistry> {
        let paths = source::discover(&self.config.input.dir, &self.config.input.extension)?;
        let mut builder = RegistryBuilder::new();

        for path in paths {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let loaded = source::load_sheet(&path)
                .map_err(Error::from)
                .and_then(|raw| {
                    debug!("Loaded '{}' with {} row(s)", raw.name(), raw.row_count());
                    builder.insert(raw)
                });
            if let Err(err) = loaded {
                outcomes.push(TableOutcome { name, result: Err(err) });
            }
        }
        Ok(builder.build())
    }

    fn compile_table(&self, raw: &RawTable, registry: &TableRegistry, manifest_dir: &Path) -> Result<TableEntry> {
        let table = validate_table(raw, registry)?;
        debug!("Validated '{}': {} row(s)", table.name, table.row_count());

        let mut artifacts = Vec::new();
        for (emitter, dir) in &self.emitters {
            for artifact in emitter.emit(&table)? {
                let path = dir.join(&artifact.file_name);
                fs::write(&path, &artifact.bytes)?;
                debug!("{} wrote {}", emitter.name(), path.display());

                let file = if path.starts_with(manifest_dir) {
                    manifest::relative_to(&path, manifest_dir)
                } else {
                    fs::canonicalize(&path)?
                };
                artifacts.push(ArtifactEntry {
                    file,
                    checksum: Checksum::from_bytes(&artifact.bytes),
                    bytes: artifact.bytes.len(),
                });
            }
        }

        info!("Compiled '{}' ({} rows, {} artifact(s))", table.name, table.row_count(), artifacts.len());
        Ok(TableEntry {
            name: table.name,
            columns: table.fields.len(),
            rows: table.rows.len(),
            artifacts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::value::Cell;

    fn raw(name: &str, headers: &[&str], rows: Vec<Vec<Cell>>) -> RawTable {
        RawTable::new(name, headers.iter().map(|h| h.to_string()).collect(), rows)
    }

    fn registry(tables: Vec<RawTable>) -> TableRegistry {
        let mut builder = RegistryBuilder::new();
        for table in tables {
            builder.insert(table).unwrap();
        }
        builder.build()
    }

    #[test]
    fn test_duplicate_field_names() {
        let err = parse_header(&raw("T", &["id|int32", "id|string"], vec![])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateField);
    }

    #[test]
    fn test_header_errors_carry_column() {
        let err = parse_header(&raw("T", &["id|int32", "a|weird"], vec![])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedType);
        assert!(matches!(err, TableError::Header { index: 1, .. }));
    }

    #[test]
    fn test_validate_table_builds_rows() {
        let item = raw(
            "Item",
            &["id|int32", "name|string|null", "rare|bool"],
            vec![
                vec![Cell::Int(1), Cell::Text("Sword".into()), Cell::Bool(true)],
                vec![Cell::Int(2), Cell::Empty, Cell::Empty],
            ],
        );
        let reg = registry(vec![item.clone()]);
        let table = validate_table(&item, &reg).unwrap();

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.value(0, "name"), Some(&Value::String("Sword".into())));
        assert_eq!(table.value(1, "name"), None);
        assert_eq!(table.value(1, "rare"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_schema_errors_before_row_errors() {
        // Row 1 has a null in a non-null column, but the unknown FK target wins
        let recipe = raw(
            "Recipe",
            &["id|int32", "itemId|int32^id(Item)"],
            vec![vec![Cell::Empty, Cell::Int(1)]],
        );
        let reg = registry(vec![recipe.clone()]);
        let err = validate_table(&recipe, &reg).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownTable);
    }

    #[test]
    fn test_type_errors_before_constraint_errors() {
        let hero = raw(
            "Hero",
            &["level|int32^Range(1,10)", "name|string"],
            vec![vec![Cell::Int(50), Cell::Empty]],
        );
        let reg = registry(vec![hero.clone()]);
        let err = validate_table(&hero, &reg).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NullNotAllowed);
    }

    #[test]
    fn test_validation_is_order_independent() {
        let item = raw("Item", &["id|int32"], vec![vec![Cell::Int(1)], vec![Cell::Int(2)], vec![Cell::Int(3)]]);
        let recipe = raw("Recipe", &["itemId|int32^id(Item)"], vec![vec![Cell::Int(2)], vec![Cell::Int(4)]]);
        let reg = registry(vec![recipe.clone(), item.clone()]);

        let dependent_first = validate_table(&recipe, &reg);
        assert!(validate_table(&item, &reg).is_ok());
        assert_eq!(validate_table(&recipe, &reg), dependent_first);

        let err = dependent_first.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ForeignKeyViolation);
        assert_eq!(err.row(), Some(2));
    }

    #[test]
    fn test_self_reference() {
        let node = raw(
            "Node",
            &["id|int32", "parent|int32^id(Node)|null"],
            vec![vec![Cell::Int(1), Cell::Empty], vec![Cell::Int(2), Cell::Int(1)]],
        );
        let reg = registry(vec![node.clone()]);
        assert!(validate_table(&node, &reg).is_ok());
    }
}
