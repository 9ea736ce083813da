//! Binary table codec
//!
//! Self-describing, append-only layout. All integers are little-endian.
//!
//! ```text
//! column_count        i32
//! per column:
//!   name_len          i32
//!   name              UTF-8
//!   type_len          i32
//!   type_tag          UTF-8 ("int32", "int64", "float32", "string", "bool", "timestamp")
//! row_count           i32
//! per row, per column in schema order:
//!   int32             4 bytes two's complement
//!   int64             8 bytes two's complement
//!   float32           4 bytes IEEE-754
//!   bool              1 byte (0/1)
//!   string/timestamp  i32 length + UTF-8 (timestamps as "YYYY-MM-DD HH:MM:SS")
//! ```
//!
//! A null is written as the 4-byte [`NULL_SENTINEL`] in place of the value
//! (fixed-width types) or of the length prefix (string/timestamp). Constraints
//! and nullability are not persisted; [`DecodedTable::with_schema`] re-attaches
//! them.

use std::io::Write;

use chrono::NaiveDateTime;

use crate::descriptor::{FieldDescriptor, FieldType};
use crate::error::CodecError;
use crate::table::Table;
use crate::value::{Row, Value, TIMESTAMP_FORMAT};

/// Marker written in place of an absent value
pub const NULL_SENTINEL: i32 = -999_999_999;

const SENTINEL_BYTES: [u8; 4] = NULL_SENTINEL.to_le_bytes();

/// Encode a validated table
pub fn encode(table: &Table) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    encode_to(table, &mut buf)?;
    Ok(buf)
}

/// Encode a validated table into a writer
pub fn encode_to<W: Write>(table: &Table, writer: &mut W) -> Result<(), CodecError> {
    write_len(writer, table.fields.len())?;
    for field in &table.fields {
        write_str(writer, &field.name)?;
        write_str(writer, field.field_type.tag())?;
    }

    write_len(writer, table.rows.len())?;
    for (index, row) in table.rows.iter().enumerate() {
        if row.len() != table.fields.len() {
            return Err(CodecError::SchemaMismatch {
                column: String::new(),
                row: index + 1,
                reason: format!("row has {} values for {} columns", row.len(), table.fields.len()),
            });
        }
        for (field, value) in table.fields.iter().zip(row.values()) {
            write_cell(writer, field, value.as_ref(), index + 1)?;
        }
    }
    Ok(())
}

fn write_cell<W: Write>(
    writer: &mut W,
    field: &FieldDescriptor,
    value: Option<&Value>,
    row: usize,
) -> Result<(), CodecError> {
    let mismatch = |reason: String| CodecError::SchemaMismatch {
        column: field.name.clone(),
        row,
        reason,
    };

    let Some(value) = value else {
        // bool has a 1-byte slot; the sentinel would desynchronize the decoder
        if field.field_type == FieldType::Bool {
            return Err(mismatch("bool columns cannot hold null".to_string()));
        }
        writer.write_all(&SENTINEL_BYTES)?;
        return Ok(());
    };

    if value.field_type() != field.field_type {
        return Err(mismatch(format!(
            "{} value in a {} column",
            value.field_type(),
            field.field_type
        )));
    }

    let bytes_start_with_sentinel = match value {
        Value::Int32(v) => *v == NULL_SENTINEL,
        Value::Int64(v) => v.to_le_bytes()[..4] == SENTINEL_BYTES,
        Value::Float32(v) => v.to_le_bytes() == SENTINEL_BYTES,
        Value::String(_) | Value::Bool(_) | Value::Timestamp(_) => false,
    };
    if bytes_start_with_sentinel {
        return Err(CodecError::ReservedSentinel {
            column: field.name.clone(),
            row,
        });
    }

    match value {
        Value::Int32(v) => writer.write_all(&v.to_le_bytes())?,
        Value::Int64(v) => writer.write_all(&v.to_le_bytes())?,
        Value::Float32(v) => writer.write_all(&v.to_le_bytes())?,
        Value::Bool(b) => writer.write_all(&[u8::from(*b)])?,
        Value::String(s) => write_str(writer, s)?,
        Value::Timestamp(t) => write_str(writer, &t.format(TIMESTAMP_FORMAT).to_string())?,
    }
    Ok(())
}

fn write_len<W: Write>(writer: &mut W, len: usize) -> Result<(), CodecError> {
    let len = i32::try_from(len).map_err(|_| CodecError::LengthOverflow { len })?;
    writer.write_all(&len.to_le_bytes())?;
    Ok(())
}

fn write_str<W: Write>(writer: &mut W, s: &str) -> Result<(), CodecError> {
    write_len(writer, s.len())?;
    writer.write_all(s.as_bytes())?;
    Ok(())
}

/// A column as persisted: name and type only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedColumn {
    pub name: String,
    pub field_type: FieldType,
}

/// Result of [`decode`]: persisted columns plus typed rows
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTable {
    pub columns: Vec<DecodedColumn>,
    pub rows: Vec<Row>,
}

impl DecodedTable {
    /// Rebuild a [`Table`] using the schema it was encoded from, which must list the
    /// same columns with the same types in the same order.
    pub fn with_schema(self, name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Result<Table, CodecError> {
        if fields.len() != self.columns.len() {
            return Err(CodecError::SchemaMismatch {
                column: String::new(),
                row: 0,
                reason: format!("schema has {} columns, artifact has {}", fields.len(), self.columns.len()),
            });
        }
        for (field, column) in fields.iter().zip(&self.columns) {
            if field.name != column.name || field.field_type != column.field_type {
                return Err(CodecError::SchemaMismatch {
                    column: field.name.clone(),
                    row: 0,
                    reason: format!(
                        "schema declares {}|{}, artifact has {}|{}",
                        field.name, field.field_type, column.name, column.field_type
                    ),
                });
            }
        }
        Ok(Table::new(name, fields, self.rows))
    }

    /// Plain descriptors for the persisted columns
    pub fn fields(&self) -> Vec<FieldDescriptor> {
        self.columns
            .iter()
            .map(|c| FieldDescriptor::new(c.name.clone(), c.field_type))
            .collect()
    }
}

/// Decode a binary artifact
pub fn decode(bytes: &[u8]) -> Result<DecodedTable, CodecError> {
    let mut reader = Reader::new(bytes);

    let column_count = reader.read_len()?;
    let mut columns = Vec::with_capacity(column_count.min(reader.remaining()));
    for _ in 0..column_count {
        let name = reader.read_string()?;
        let tag = reader.read_string()?;
        let field_type = FieldType::from_tag(&tag).ok_or(CodecError::UnknownTypeTag { tag })?;
        columns.push(DecodedColumn { name, field_type });
    }

    let row_offset = reader.offset;
    let row_count = reader.read_len()?;
    // rows without columns occupy no bytes, so nothing bounds the count
    if column_count == 0 && row_count > 0 {
        return Err(CodecError::MalformedValue {
            offset: row_offset,
            reason: format!("{row_count} rows declared for a table with no columns"),
        });
    }
    let mut rows = Vec::with_capacity(row_count.min(reader.remaining()));
    for _ in 0..row_count {
        let values = columns
            .iter()
            .map(|c| reader.read_value(c.field_type))
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(Row(values));
    }

    if reader.remaining() > 0 {
        return Err(CodecError::TrailingBytes {
            count: reader.remaining(),
        });
    }

    Ok(DecodedTable { columns, rows })
}

/// Forward-only cursor over a byte slice
struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn peek(&self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::TruncatedInput {
                offset: self.offset,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let data: &'a [u8] = self.data;
        Ok(&data[self.offset..self.offset + n])
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let bytes = self.peek(n)?;
        self.offset += n;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn read_i32(&mut self) -> Result<i32, CodecError> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    fn next_is_sentinel(&self) -> Result<bool, CodecError> {
        Ok(self.peek(4)? == SENTINEL_BYTES)
    }

    /// A count or length that must be non-negative
    fn read_len(&mut self) -> Result<usize, CodecError> {
        let offset = self.offset;
        let value = self.read_i32()?;
        usize::try_from(value).map_err(|_| CodecError::NegativeLength { offset, value })
    }

    fn read_string(&mut self) -> Result<String, CodecError> {
        let len = self.read_len()?;
        self.read_utf8(len)
    }

    fn read_utf8(&mut self, len: usize) -> Result<String, CodecError> {
        let offset = self.offset;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| CodecError::MalformedValue {
            offset,
            reason: format!("invalid UTF-8: {e}"),
        })
    }

    /// Length-prefixed payload, or `None` when the prefix is the sentinel
    fn read_nullable_string(&mut self) -> Result<Option<String>, CodecError> {
        if self.next_is_sentinel()? {
            self.offset += 4;
            return Ok(None);
        }
        self.read_string().map(Some)
    }

    fn read_value(&mut self, field_type: FieldType) -> Result<Option<Value>, CodecError> {
        let offset = self.offset;
        match field_type {
            FieldType::Int32 => {
                let v = self.read_i32()?;
                Ok((v != NULL_SENTINEL).then_some(Value::Int32(v)))
            }
            FieldType::Int64 => {
                if self.next_is_sentinel()? {
                    self.offset += 4;
                    return Ok(None);
                }
                Ok(Some(Value::Int64(i64::from_le_bytes(self.take_array()?))))
            }
            FieldType::Float32 => {
                let bytes: [u8; 4] = self.take_array()?;
                Ok((bytes != SENTINEL_BYTES).then(|| Value::Float32(f32::from_le_bytes(bytes))))
            }
            FieldType::Bool => match self.take_array::<1>()? {
                [0] => Ok(Some(Value::Bool(false))),
                [1] => Ok(Some(Value::Bool(true))),
                [other] => Err(CodecError::MalformedValue {
                    offset,
                    reason: format!("bool byte {other}"),
                }),
            },
            FieldType::String => Ok(self.read_nullable_string()?.map(Value::String)),
            FieldType::Timestamp => match self.read_nullable_string()? {
                None => Ok(None),
                Some(text) => NaiveDateTime::parse_from_str(&text, TIMESTAMP_FORMAT)
                    .map(|t| Some(Value::Timestamp(t)))
                    .map_err(|e| CodecError::MalformedValue {
                        offset,
                        reason: format!("timestamp '{text}': {e}"),
                    }),
            },
        }
    }
}
