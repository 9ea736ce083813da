//! Output adapters
//!
//! An [`Emitter`] turns one validated [`Table`] into the files a consumer needs.
//! Emitters only see typed values; every conversion is an exhaustive match over
//! [`crate::value::Value`] / [`FieldType`], so adding a column type fails to compile until each
//! output handles it.
//!
//! - [`BinaryEmitter`]: `{table}.dat`, see [`crate::codec`]
//! - [`ProtoEmitter`]: `{table}.proto` plus `{table}.rows.json` for an external
//!   protobuf toolchain

use crate::codec;
use crate::descriptor::FieldType;
use crate::error::Result;
use crate::table::Table;

/// A file produced for one table
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Converts a validated table into output files
pub trait Emitter: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    fn emit(&self, table: &Table) -> Result<Vec<Artifact>>;
}

/// Writes the custom binary layout
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryEmitter;

impl Emitter for BinaryEmitter {
    fn name(&self) -> &'static str {
        "binary"
    }

    fn emit(&self, table: &Table) -> Result<Vec<Artifact>> {
        Ok(vec![Artifact {
            file_name: format!("{}.dat", table.name),
            bytes: codec::encode(table)?,
        }])
    }
}

/// Writes a proto3 schema and the typed rows for an external encoder
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtoEmitter;

impl Emitter for ProtoEmitter {
    fn name(&self) -> &'static str {
        "proto"
    }

    fn emit(&self, table: &Table) -> Result<Vec<Artifact>> {
        let rows = serde_json::to_vec_pretty(&rows_json(table))?;
        Ok(vec![
            Artifact {
                file_name: format!("{}.proto", table.name),
                bytes: render_proto(table).into_bytes(),
            },
            Artifact {
                file_name: format!("{}.rows.json", table.name),
                bytes: rows,
            },
        ])
    }
}

/// proto3 scalar for a column type; timestamps travel as canonical strings
pub fn proto_type(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Int32 => "int32",
        FieldType::Int64 => "int64",
        FieldType::Float32 => "float",
        FieldType::String => "string",
        FieldType::Bool => "bool",
        FieldType::Timestamp => "string",
    }
}

/// Render the `.proto` schema: one row message and a wrapper holding all rows
pub fn render_proto(table: &Table) -> String {
    let mut output = String::new();
    output.push_str("syntax = \"proto3\";\n\n");

    output.push_str(&format!("message {}Row {{\n", table.name));
    for (index, field) in table.fields.iter().enumerate() {
        output.push_str(&format!(
            "    {} {} = {};\n",
            proto_type(field.field_type),
            field.name,
            index + 1
        ));
    }
    output.push_str("}\n\n");

    output.push_str(&format!("message {} {{\n", table.name));
    output.push_str(&format!("    repeated {}Row rows = 1;\n", table.name));
    output.push_str("}\n");

    output
}

/// Typed rows as JSON objects keyed by field name. Nulls are omitted, which
/// leaves the proto3 field unset.
pub fn rows_json(table: &Table) -> serde_json::Value {
    let rows = table
        .rows
        .iter()
        .map(|row| {
            let object: serde_json::Map<String, serde_json::Value> = table
                .fields
                .iter()
                .zip(row.values())
                .filter_map(|(field, value)| value.as_ref().map(|v| (field.name.clone(), v.to_json())))
                .collect();
            serde_json::Value::Object(object)
        })
        .collect();
    serde_json::json!({ "table": table.name, "rows": serde_json::Value::Array(rows) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::FieldDescriptor;
    use crate::value::{Row, Value};

    fn table() -> Table {
        Table::new(
            "Item",
            vec![
                FieldDescriptor::new("id", FieldType::Int32),
                FieldDescriptor::new("weight", FieldType::Float32).nullable(),
                FieldDescriptor::new("sold", FieldType::Timestamp).nullable(),
            ],
            vec![
                Row(vec![Some(Value::Int32(1)), Some(Value::Float32(1.5)), None]),
                Row(vec![Some(Value::Int32(2)), None, None]),
            ],
        )
    }

    #[test]
    fn test_render_proto() {
        let proto = render_proto(&table());
        assert!(proto.starts_with("syntax = \"proto3\";"));
        assert!(proto.contains("message ItemRow {\n    int32 id = 1;\n    float weight = 2;\n    string sold = 3;\n}"));
        assert!(proto.contains("repeated ItemRow rows = 1;"));
    }

    #[test]
    fn test_rows_json_omits_nulls() {
        let json = rows_json(&table());
        assert_eq!(json["rows"][0], serde_json::json!({ "id": 1, "weight": 1.5 }));
        assert_eq!(json["rows"][1], serde_json::json!({ "id": 2 }));
    }

    #[test]
    fn test_emitters_name_files_after_table() {
        let binary = BinaryEmitter.emit(&table()).unwrap();
        assert_eq!(binary.len(), 1);
        assert_eq!(binary[0].file_name, "Item.dat");

        let proto = ProtoEmitter.emit(&table()).unwrap();
        let names: Vec<_> = proto.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(names, vec!["Item.proto", "Item.rows.json"]);
    }
}
