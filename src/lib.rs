//! Table Compiler
//!
//! Build-time compiler for tabular configuration data. Sheets carry their own
//! schema in the header row, one descriptor per column:
//!
//! ```text
//! name|type[^constraint...][|null]
//!
//! id|int32
//! level|int32^Range(1,100)
//! itemId|int32^id(Item)|null
//! ```
//!
//! ## Features
//!
//! - **Typed validation**: every cell is checked against its column type and null policy
//! - **Constraints**: half-open numeric ranges and cross-table foreign keys
//! - **Order-independent**: foreign keys resolve against a frozen registry of all tables
//! - **Binary tables**: compact self-describing layout with a null sentinel
//! - **Proto output**: proto3 schemas plus typed rows for an external encoder
//! - **Checksum manifest**: SHA256 for every artifact
//!
//! ## Architecture
//!
//! ```text
//! sheets/*.json ──source──▶ RawTable ──▶ RegistryBuilder ──build──▶ TableRegistry
//!                                                                        │
//!            ┌───────────────────────────────────────────────────────────┘
//!            ▼
//!   pipeline::validate_table
//!     descriptor::FieldDescriptor::parse   (every header)
//!     constraint::check_header             (range kinds, FK targets)
//!     validate::validate_column            (types, nulls)
//!     constraint::check_column             (ranges, FK membership)
//!            │
//!            ▼
//!          Table ──emit──▶ {table}.dat / {table}.proto / {table}.rows.json
//!                                        │
//!                                        ▼
//!                                  manifest.json
//! ```

pub mod checksum;
pub mod codec;
pub mod config;
pub mod constraint;
pub mod descriptor;
pub mod emit;
pub mod error;
pub mod manifest;
pub mod pipeline;
pub mod registry;
pub mod source;
pub mod table;
pub mod validate;
pub mod value;

pub use checksum::Checksum;
pub use codec::{decode, encode, DecodedTable, NULL_SENTINEL};
pub use config::CompilerConfig;
pub use descriptor::{Constraint, FieldDescriptor, FieldType, Number};
pub use emit::{Artifact, BinaryEmitter, Emitter, ProtoEmitter};
pub use error::{CodecError, DescriptorError, Error, ErrorKind, Result, SourceError, TableError};
pub use manifest::Manifest;
pub use pipeline::{validate_table, Compiler, RunReport, TableOutcome};
pub use registry::{RegistryBuilder, TableRegistry};
pub use table::{RawTable, Table};
pub use value::{Cell, Row, Value};
