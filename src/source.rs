//! Sheet sources
//!
//! Sheets arrive as JSON documents exported from a spreadsheet:
//!
//! ```json
//! { "headers": ["id|int32", "name|string|null"], "rows": [[1, "Sword"], [2, null]] }
//! ```
//!
//! The file stem is the table name. Integral JSON numbers become [`Cell::Int`],
//! other numbers [`Cell::Float`]; `null` and blank strings become [`Cell::Empty`].

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use walkdir::WalkDir;

use crate::error::SourceError;
use crate::table::RawTable;
use crate::value::Cell;

#[derive(Debug, Deserialize)]
struct SheetDocument {
    headers: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<serde_json::Value>>,
}

/// Sheet files directly inside `dir` with the given extension, sorted by path
pub fn discover(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, SourceError> {
    let extension = extension.trim_start_matches('.');
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|source| SourceError::Walk {
            dir: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == extension) {
            paths.push(path.to_path_buf());
        }
    }
    paths.sort();
    Ok(paths)
}

/// Read one sheet file; the table is named after the file stem
pub fn load_sheet(path: &Path) -> Result<RawTable, SourceError> {
    let content = fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| SourceError::Parse {
            source_name: path.display().to_string(),
            detail: "file name is not valid UTF-8".to_string(),
        })?;
    parse_sheet(name, &content)
}

/// Parse a sheet document already in memory
pub fn parse_sheet(name: &str, content: &str) -> Result<RawTable, SourceError> {
    let document: SheetDocument = serde_json::from_str(content).map_err(|e| SourceError::Parse {
        source_name: name.to_string(),
        detail: e.to_string(),
    })?;

    let width = document.headers.len();
    let mut rows = Vec::with_capacity(document.rows.len());
    for (index, raw) in document.rows.into_iter().enumerate() {
        if raw.len() > width {
            return Err(SourceError::RowTooLong {
                source_name: name.to_string(),
                row: index + 1,
                cells: raw.len(),
                headers: width,
            });
        }
        let row = raw
            .into_iter()
            .map(|value| to_cell(name, index + 1, value))
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(row);
    }

    Ok(RawTable::new(name, document.headers, rows))
}

fn to_cell(name: &str, row: usize, value: serde_json::Value) -> Result<Cell, SourceError> {
    use serde_json::Value as Json;

    Ok(match value {
        Json::Null => Cell::Empty,
        Json::Bool(b) => Cell::Bool(b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Cell::Int(i)
            } else if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                    Cell::Int(f as i64)
                } else {
                    Cell::Float(f)
                }
            } else {
                return Err(SourceError::Parse {
                    source_name: name.to_string(),
                    detail: format!("row {row}: number {n} does not fit a cell"),
                });
            }
        }
        Json::String(s) if s.trim().is_empty() => Cell::Empty,
        Json::String(s) => Cell::Text(s),
        Json::Array(_) | Json::Object(_) => {
            return Err(SourceError::Parse {
                source_name: name.to_string(),
                detail: format!("row {row}: nested values are not allowed in cells"),
            })
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pipeline::validate_table;
    use crate::registry::RegistryBuilder;

    #[test]
    fn test_parse_sheet_cells() {
        let sheet = parse_sheet(
            "Item",
            r#"{"headers": ["id|int32", "w|float32", "name|string|null", "ok|bool"],
                "rows": [[1, 2.5, "  ", true], [2, 3.0, null, false]]}"#,
        )
        .unwrap();

        assert_eq!(sheet.name(), "Item");
        assert_eq!(
            sheet.rows()[0],
            vec![Cell::Int(1), Cell::Float(2.5), Cell::Empty, Cell::Bool(true)]
        );
        assert_eq!(sheet.rows()[1][1], Cell::Int(3));
        assert_eq!(sheet.rows()[1][2], Cell::Empty);
    }

    #[test]
    fn test_integers_beyond_i64_stay_floats() {
        let sheet = parse_sheet(
            "T",
            r#"{"headers": ["big|int64"], "rows": [[9223372036854775808], [9223372036854775807]]}"#,
        )
        .unwrap();
        assert!(matches!(sheet.rows()[0][0], Cell::Float(_)));
        assert_eq!(sheet.rows()[1][0], Cell::Int(i64::MAX));

        let mut builder = RegistryBuilder::new();
        builder.insert(sheet.clone()).unwrap();
        let err = validate_table(&sheet, &builder.build()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(err.row(), Some(1));
    }

    #[test]
    fn test_short_rows_padded_long_rows_rejected() {
        let sheet = parse_sheet("T", r#"{"headers": ["a|int32", "b|int32|null"], "rows": [[1]]}"#).unwrap();
        assert_eq!(sheet.rows()[0], vec![Cell::Int(1), Cell::Empty]);

        let err = parse_sheet("T", r#"{"headers": ["a|int32"], "rows": [[1, 2]]}"#).unwrap_err();
        assert!(matches!(err, SourceError::RowTooLong { row: 1, cells: 2, headers: 1, .. }));
    }

    #[test]
    fn test_rejects_nested_cells_and_bad_json() {
        assert!(matches!(
            parse_sheet("T", r#"{"headers": ["a|string"], "rows": [[{"x": 1}]]}"#),
            Err(SourceError::Parse { .. })
        ));
        assert!(matches!(parse_sheet("T", "not json"), Err(SourceError::Parse { .. })));
    }

    #[test]
    fn test_discover_and_load() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.json"), r#"{"headers": ["id|int32"], "rows": [[1]]}"#).unwrap();
        fs::write(dir.path().join("a.json"), r#"{"headers": ["id|int32"]}"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.json"), "{}").unwrap();

        let paths = discover(dir.path(), ".json").unwrap();
        let names: Vec<_> = paths.iter().map(|p| p.file_name().unwrap().to_str().unwrap()).collect();
        assert_eq!(names, vec!["a.json", "b.json"]);

        let sheet = load_sheet(&paths[1]).unwrap();
        assert_eq!(sheet.name(), "b");
        assert_eq!(sheet.row_count(), 1);
    }
}
