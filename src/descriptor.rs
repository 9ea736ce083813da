//! Field descriptor parsing
//!
//! Every column header carries its own schema in a compact form:
//!
//! ```text
//! name|type[^constraint]*[|null]
//!
//! hp|int32|null
//! level|int32^Range(1,100)
//! weight|float32^Range(0,!)
//! itemId|int32^id(Item)
//! ```
//!
//! A constraint is either `Range(min,max)` (numeric columns, `max` exclusive,
//! `!` for unbounded) or `field(Table)`, a foreign key into another table.
//! Parsing is a pure function of the header string; cross-table checks happen
//! later in [`crate::constraint`].

use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::DescriptorError;

/// Left-hand side of a range constraint clause
pub const RANGE_KEYWORD: &str = "Range";

/// Upper bound marker meaning "no upper bound"
pub const UNBOUNDED: &str = "!";

/// Declared column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Int32,
    Int64,
    Float32,
    String,
    Bool,
    Timestamp,
}

impl FieldType {
    pub const ALL: [FieldType; 6] = [
        FieldType::Int32,
        FieldType::Int64,
        FieldType::Float32,
        FieldType::String,
        FieldType::Bool,
        FieldType::Timestamp,
    ];

    /// Canonical tag, as written in headers and persisted in binary artifacts
    pub fn tag(&self) -> &'static str {
        match self {
            FieldType::Int32 => "int32",
            FieldType::Int64 => "int64",
            FieldType::Float32 => "float32",
            FieldType::String => "string",
            FieldType::Bool => "bool",
            FieldType::Timestamp => "timestamp",
        }
    }

    /// Look up a canonical tag. Binary artifacts only ever contain these.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }

    /// Parse a header type token, accepting the legacy spellings
    /// `int`, `long`, `float` and `time`.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "int" => Some(FieldType::Int32),
            "long" => Some(FieldType::Int64),
            "float" => Some(FieldType::Float32),
            "time" => Some(FieldType::Timestamp),
            other => Self::from_tag(other),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Int32 | FieldType::Int64 | FieldType::Float32)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, FieldType::Int32 | FieldType::Int64)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A numeric range bound or a numeric cell value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    /// Integral text becomes [`Number::Int`], anything else that parses as a
    /// finite float becomes [`Number::Float`].
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok(i) = text.parse::<i64>() {
            return Some(Number::Int(i));
        }
        text.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Number::Float)
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    /// Exact for two integers, IEEE comparison otherwise
    pub fn compare(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{i}"),
            // Debug keeps the decimal point so the rendering reparses as a float
            Number::Float(x) => write!(f, "{x:?}"),
        }
    }
}

/// A declarative rule attached to a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    /// `min <= v < max`; `max: None` means unbounded
    Range { min: Number, max: Option<Number> },
    /// Every value must appear in `field` of `table`
    ForeignKey { field: String, table: String },
}

impl Constraint {
    /// Whether `value` satisfies a range constraint. Always true for foreign keys.
    pub fn admits(&self, value: Number) -> bool {
        match self {
            Constraint::Range { min, max } => {
                let above_min = matches!(
                    value.compare(*min),
                    Some(Ordering::Greater | Ordering::Equal)
                );
                let below_max = match max {
                    Some(max) => value.compare(*max) == Some(Ordering::Less),
                    None => true,
                };
                above_min && below_max
            }
            Constraint::ForeignKey { .. } => true,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Range { min, max: Some(max) } => write!(f, "{RANGE_KEYWORD}({min},{max})"),
            Constraint::Range { min, max: None } => write!(f, "{RANGE_KEYWORD}({min},{UNBOUNDED})"),
            Constraint::ForeignKey { field, table } => write!(f, "{field}({table})"),
        }
    }
}

/// Parsed form of one column header. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub nullable: bool,
}

impl FieldDescriptor {
    /// Create a plain descriptor with no constraints
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            constraints: Vec::new(),
            nullable: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Parse a header string
    pub fn parse(header: &str) -> Result<Self, DescriptorError> {
        let segments: Vec<&str> = header.split('|').collect();
        if !(2..=3).contains(&segments.len()) {
            return Err(malformed(
                header,
                format!("expected 2 or 3 '|'-separated segments, found {}", segments.len()),
            ));
        }

        let name = segments[0].trim();
        if name.is_empty() {
            return Err(malformed(header, "field name is empty"));
        }
        if !identifier_pattern().is_match(name) {
            return Err(malformed(header, format!("field name '{name}' is not an identifier")));
        }

        let mut tokens = segments[1].split('^');
        let type_token = tokens.next().unwrap_or_default().trim();
        if type_token.is_empty() {
            return Err(malformed(header, "field type is empty"));
        }
        let field_type = FieldType::parse(type_token).ok_or_else(|| DescriptorError::UnsupportedType {
            type_name: type_token.to_string(),
        })?;

        let constraints = tokens.map(parse_constraint).collect::<Result<Vec<_>, _>>()?;

        let nullable = match segments.get(2) {
            None => false,
            Some(flag) => {
                let flag = flag.trim();
                if flag.eq_ignore_ascii_case("null") || flag.eq_ignore_ascii_case("nullable") {
                    true
                } else {
                    return Err(DescriptorError::MalformedNullFlag {
                        flag: flag.to_string(),
                    });
                }
            }
        };

        Ok(Self {
            name: name.to_string(),
            field_type,
            constraints,
            nullable,
        })
    }

    /// Foreign-key constraints as `(field, table)` pairs
    pub fn foreign_keys(&self) -> impl Iterator<Item = (&str, &str)> {
        self.constraints.iter().filter_map(|c| match c {
            Constraint::ForeignKey { field, table } => Some((field.as_str(), table.as_str())),
            Constraint::Range { .. } => None,
        })
    }
}

/// Canonical header rendering; reparses to an equal descriptor
impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.name, self.field_type)?;
        for constraint in &self.constraints {
            write!(f, "^{constraint}")?;
        }
        if self.nullable {
            f.write_str("|null")?;
        }
        Ok(())
    }
}

/// Lenient name lookup used for foreign-key targets: the text before the first `|`.
pub fn header_name(header: &str) -> &str {
    header.split('|').next().unwrap_or_default().trim()
}

fn malformed(header: &str, reason: impl Into<String>) -> DescriptorError {
    DescriptorError::MalformedDescriptor {
        header: header.to_string(),
        reason: reason.into(),
    }
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern"))
}

fn constraint_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([^()]*)\(([^()]*)\)$").expect("constraint pattern"))
}

fn parse_constraint(clause: &str) -> Result<Constraint, DescriptorError> {
    let trimmed = clause.trim();
    let invalid = |reason: &str| DescriptorError::MalformedConstraint {
        clause: trimmed.to_string(),
        reason: reason.to_string(),
    };

    let captures = constraint_pattern()
        .captures(trimmed)
        .ok_or_else(|| invalid("expected 'ref(target)'"))?;
    let reference = captures[1].trim();
    let target = captures[2].trim();
    if reference.is_empty() || target.is_empty() {
        return Err(invalid("reference and target must both be non-empty"));
    }

    if reference == RANGE_KEYWORD {
        return parse_range(target).map_err(|reason| invalid(&reason));
    }

    Ok(Constraint::ForeignKey {
        field: reference.to_string(),
        table: target.to_string(),
    })
}

fn parse_range(body: &str) -> Result<Constraint, String> {
    let bounds: Vec<&str> = body.split(',').map(str::trim).collect();
    if bounds.len() != 2 {
        return Err(format!("{RANGE_KEYWORD} expects 'min,max', found '{body}'"));
    }

    let min = Number::parse(bounds[0]).ok_or_else(|| format!("min '{}' is not a number", bounds[0]))?;
    let max = if bounds[1] == UNBOUNDED {
        None
    } else {
        Some(Number::parse(bounds[1]).ok_or_else(|| format!("max '{}' is not a number", bounds[1]))?)
    };

    if let Some(max) = max {
        if min.compare(max) != Some(Ordering::Less) {
            return Err(format!("min {min} must be below max {max}"));
        }
    }

    Ok(Constraint::Range { min, max })
}
