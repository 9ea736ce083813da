//! Error types for the table compiler
//!
//! Header, validation and codec failures each get their own enum so callers can
//! match on the stage that failed. [`ErrorKind`] flattens them into a single
//! taxonomy with stable codes for reports and manifests.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::descriptor::FieldType;

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Stable classification of every failure the engine can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedDescriptor,
    UnsupportedType,
    MalformedConstraint,
    MalformedNullFlag,
    DuplicateField,
    UnknownTable,
    UnknownField,
    NullNotAllowed,
    TypeMismatch,
    InvalidBool,
    InvalidTimestamp,
    RangeViolation,
    ForeignKeyViolation,
    ConstraintTypeMismatch,
    TruncatedInput,
    UnknownTypeTag,
    MalformedBinary,
    ReservedSentinel,
}

impl ErrorKind {
    /// Returns the report code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::MalformedDescriptor => "MALFORMED_DESCRIPTOR",
            ErrorKind::UnsupportedType => "UNSUPPORTED_TYPE",
            ErrorKind::MalformedConstraint => "MALFORMED_CONSTRAINT",
            ErrorKind::MalformedNullFlag => "MALFORMED_NULL_FLAG",
            ErrorKind::DuplicateField => "DUPLICATE_FIELD",
            ErrorKind::UnknownTable => "UNKNOWN_TABLE",
            ErrorKind::UnknownField => "UNKNOWN_FIELD",
            ErrorKind::NullNotAllowed => "NULL_NOT_ALLOWED",
            ErrorKind::TypeMismatch => "TYPE_MISMATCH",
            ErrorKind::InvalidBool => "INVALID_BOOL",
            ErrorKind::InvalidTimestamp => "INVALID_TIMESTAMP",
            ErrorKind::RangeViolation => "RANGE_VIOLATION",
            ErrorKind::ForeignKeyViolation => "FOREIGN_KEY_VIOLATION",
            ErrorKind::ConstraintTypeMismatch => "CONSTRAINT_TYPE_MISMATCH",
            ErrorKind::TruncatedInput => "TRUNCATED_INPUT",
            ErrorKind::UnknownTypeTag => "UNKNOWN_TYPE_TAG",
            ErrorKind::MalformedBinary => "MALFORMED_BINARY",
            ErrorKind::ReservedSentinel => "RESERVED_SENTINEL",
        }
    }

    /// True for failures detected from the header alone, before any row is read
    pub fn is_schema_level(&self) -> bool {
        matches!(
            self,
            ErrorKind::MalformedDescriptor
                | ErrorKind::UnsupportedType
                | ErrorKind::MalformedConstraint
                | ErrorKind::MalformedNullFlag
                | ErrorKind::DuplicateField
                | ErrorKind::UnknownTable
                | ErrorKind::UnknownField
                | ErrorKind::ConstraintTypeMismatch
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Failure to parse a single header string.
///
/// Carries no table context; [`TableError::Header`] attaches it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DescriptorError {
    #[error("malformed descriptor '{header}': {reason}")]
    MalformedDescriptor { header: String, reason: String },

    #[error("unsupported type '{type_name}'")]
    UnsupportedType { type_name: String },

    #[error("malformed constraint '{clause}': {reason}")]
    MalformedConstraint { clause: String, reason: String },

    #[error("invalid null flag '{flag}' (expected 'null' or 'nullable')")]
    MalformedNullFlag { flag: String },
}

impl DescriptorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DescriptorError::MalformedDescriptor { .. } => ErrorKind::MalformedDescriptor,
            DescriptorError::UnsupportedType { .. } => ErrorKind::UnsupportedType,
            DescriptorError::MalformedConstraint { .. } => ErrorKind::MalformedConstraint,
            DescriptorError::MalformedNullFlag { .. } => ErrorKind::MalformedNullFlag,
        }
    }
}

/// Validation failure for one table.
///
/// Row numbers count data rows from 1; the sheet line is `row + 1` because the
/// header occupies line 1.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("table '{table}' column {index} ('{header}'): {source}")]
    Header {
        table: String,
        index: usize,
        header: String,
        source: DescriptorError,
    },

    #[error("table '{table}': duplicate field name '{column}' in column {index}")]
    DuplicateField {
        table: String,
        column: String,
        index: usize,
    },

    #[error("table '{table}' column '{column}': referenced table '{target}' is not loaded")]
    UnknownTable {
        table: String,
        column: String,
        target: String,
    },

    #[error("table '{table}' column '{column}': field '{field}' not found in table '{target}'")]
    UnknownField {
        table: String,
        column: String,
        field: String,
        target: String,
    },

    #[error("table '{table}' column '{column}': constraint '{constraint}' cannot apply to type {field_type}")]
    ConstraintTypeMismatch {
        table: String,
        column: String,
        field_type: FieldType,
        constraint: String,
    },

    #[error("table '{table}' column '{column}' row {row} (sheet line {}): null is not allowed", .row + 1)]
    NullNotAllowed {
        table: String,
        column: String,
        row: usize,
    },

    #[error("table '{table}' column '{column}' row {row} (sheet line {}): expected {expected}, found {actual}", .row + 1)]
    TypeMismatch {
        table: String,
        column: String,
        row: usize,
        expected: FieldType,
        actual: String,
    },

    #[error("table '{table}' column '{column}' row {row} (sheet line {}): invalid boolean {value}", .row + 1)]
    InvalidBool {
        table: String,
        column: String,
        row: usize,
        value: String,
    },

    #[error("table '{table}' column '{column}' row {row} (sheet line {}): invalid timestamp '{value}' (expected year-month-day-hour-minute-second)", .row + 1)]
    InvalidTimestamp {
        table: String,
        column: String,
        row: usize,
        value: String,
    },

    #[error("table '{table}' column '{column}' row {row} (sheet line {}): value {value} outside [{min}, {max})", .row + 1)]
    RangeViolation {
        table: String,
        column: String,
        row: usize,
        value: String,
        min: String,
        max: String,
    },

    #[error("table '{table}' column '{column}' row {row} (sheet line {}): value {value} not found in '{ref_field}' of table '{target}'", .row + 1)]
    ForeignKeyViolation {
        table: String,
        column: String,
        row: usize,
        value: String,
        ref_field: String,
        target: String,
    },
}

impl TableError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TableError::Header { source, .. } => source.kind(),
            TableError::DuplicateField { .. } => ErrorKind::DuplicateField,
            TableError::UnknownTable { .. } => ErrorKind::UnknownTable,
            TableError::UnknownField { .. } => ErrorKind::UnknownField,
            TableError::ConstraintTypeMismatch { .. } => ErrorKind::ConstraintTypeMismatch,
            TableError::NullNotAllowed { .. } => ErrorKind::NullNotAllowed,
            TableError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            TableError::InvalidBool { .. } => ErrorKind::InvalidBool,
            TableError::InvalidTimestamp { .. } => ErrorKind::InvalidTimestamp,
            TableError::RangeViolation { .. } => ErrorKind::RangeViolation,
            TableError::ForeignKeyViolation { .. } => ErrorKind::ForeignKeyViolation,
        }
    }

    /// Name of the table that failed
    pub fn table(&self) -> &str {
        match self {
            TableError::Header { table, .. }
            | TableError::DuplicateField { table, .. }
            | TableError::UnknownTable { table, .. }
            | TableError::UnknownField { table, .. }
            | TableError::ConstraintTypeMismatch { table, .. }
            | TableError::NullNotAllowed { table, .. }
            | TableError::TypeMismatch { table, .. }
            | TableError::InvalidBool { table, .. }
            | TableError::InvalidTimestamp { table, .. }
            | TableError::RangeViolation { table, .. }
            | TableError::ForeignKeyViolation { table, .. } => table,
        }
    }

    /// 1-based data row for row-level failures
    pub fn row(&self) -> Option<usize> {
        match self {
            TableError::NullNotAllowed { row, .. }
            | TableError::TypeMismatch { row, .. }
            | TableError::InvalidBool { row, .. }
            | TableError::InvalidTimestamp { row, .. }
            | TableError::RangeViolation { row, .. }
            | TableError::ForeignKeyViolation { row, .. } => Some(*row),
            _ => None,
        }
    }
}

/// Binary encode/decode failures
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("truncated input at byte {offset}: need {needed} bytes, {remaining} remain")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("unknown type tag '{tag}'")]
    UnknownTypeTag { tag: String },

    #[error("negative length {value} at byte {offset}")]
    NegativeLength { offset: usize, value: i32 },

    #[error("malformed value at byte {offset}: {reason}")]
    MalformedValue { offset: usize, reason: String },

    #[error("{count} trailing bytes after the last row")]
    TrailingBytes { count: usize },

    #[error("column '{column}' row {row}: value collides with the null sentinel")]
    ReservedSentinel { column: String, row: usize },

    #[error("column '{column}' row {row}: {reason}")]
    SchemaMismatch {
        column: String,
        row: usize,
        reason: String,
    },

    #[error("length {len} does not fit a 4-byte prefix")]
    LengthOverflow { len: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CodecError::TruncatedInput { .. } => ErrorKind::TruncatedInput,
            CodecError::UnknownTypeTag { .. } => ErrorKind::UnknownTypeTag,
            CodecError::ReservedSentinel { .. } => ErrorKind::ReservedSentinel,
            _ => ErrorKind::MalformedBinary,
        }
    }
}

/// Failures reading sheet files
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("parse error in {source_name}: {detail}")]
    Parse { source_name: String, detail: String },

    #[error("{source_name}: row {row} has {cells} cells but the header has {headers} columns")]
    RowTooLong {
        source_name: String,
        row: usize,
        cells: usize,
        headers: usize,
    },

    #[error("cannot walk {dir}: {source}")]
    Walk {
        dir: PathBuf,
        source: walkdir::Error,
    },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Crate-level error
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("table '{name}' is loaded more than once")]
    DuplicateTable { name: String },

    #[error("{} table(s) failed: {}", .failed.len(), .failed.join(", "))]
    RunFailed { failed: Vec<String> },

    #[error("configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Report code used in manifests and CLI summaries
    pub fn code(&self) -> &'static str {
        match self {
            Error::Table(e) => e.kind().code(),
            Error::Codec(e) => e.kind().code(),
            Error::Source(_) => "SOURCE_ERROR",
            Error::DuplicateTable { .. } => "DUPLICATE_TABLE",
            Error::RunFailed { .. } => "RUN_FAILED",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Io(_) => "IO_ERROR",
            Error::Json(_) => "JSON_ERROR",
        }
    }
}
