use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════
//  Field Type
// ════════════════════════════════════════════════════════════════

/// Declared SQL type of a result column.
///
/// Serialized with the legacy REST names (`INTEGER`, `FLOAT`, `BOOLEAN`,
/// `RECORD`); the standard SQL names are accepted on input.
///
/// Every non-null leaf arrives as text regardless of this type; each
/// encoder parses the text according to the declared type at the last
/// possible moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    #[serde(rename = "INTEGER", alias = "INT64")]
    Int64,
    #[serde(rename = "FLOAT", alias = "FLOAT64")]
    Float64,
    /// Fixed precision, 38 digits with scale 9.
    #[serde(rename = "NUMERIC")]
    Numeric,
    /// Fixed precision, 76 digits with scale 38.
    #[serde(rename = "BIGNUMERIC")]
    BigNumeric,
    #[serde(rename = "BOOLEAN", alias = "BOOL")]
    Bool,
    #[serde(rename = "STRING")]
    String,
    /// Base64 text on the wire.
    #[serde(rename = "BYTES")]
    Bytes,
    #[serde(rename = "DATE")]
    Date,
    #[serde(rename = "DATETIME")]
    DateTime,
    #[serde(rename = "TIME")]
    Time,
    #[serde(rename = "TIMESTAMP")]
    Timestamp,
    #[serde(rename = "GEOGRAPHY")]
    Geography,
    #[serde(rename = "INTERVAL")]
    Interval,
    #[serde(rename = "JSON")]
    Json,
    /// Composite type. The field carries nested `fields`.
    #[serde(rename = "RECORD", alias = "STRUCT")]
    Record,
}

impl FieldType {
    pub fn is_record(self) -> bool {
        matches!(self, FieldType::Record)
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FieldType::Int64 => "INTEGER",
            FieldType::Float64 => "FLOAT",
            FieldType::Numeric => "NUMERIC",
            FieldType::BigNumeric => "BIGNUMERIC",
            FieldType::Bool => "BOOLEAN",
            FieldType::String => "STRING",
            FieldType::Bytes => "BYTES",
            FieldType::Date => "DATE",
            FieldType::DateTime => "DATETIME",
            FieldType::Time => "TIME",
            FieldType::Timestamp => "TIMESTAMP",
            FieldType::Geography => "GEOGRAPHY",
            FieldType::Interval => "INTERVAL",
            FieldType::Json => "JSON",
            FieldType::Record => "RECORD",
        };
        f.write_str(name)
    }
}

// ════════════════════════════════════════════════════════════════
//  Mode
// ════════════════════════════════════════════════════════════════

/// Cardinality of a field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Required,
    #[default]
    Nullable,
    Repeated,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Required => f.write_str("REQUIRED"),
            Mode::Nullable => f.write_str("NULLABLE"),
            Mode::Repeated => f.write_str("REPEATED"),
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  Field Schema
// ════════════════════════════════════════════════════════════════

/// A single column descriptor.
///
/// `fields` is non-empty only for [`FieldType::Record`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldSchema>,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, field_type: FieldType, mode: Mode) -> Self {
        Self {
            name: name.into(),
            field_type,
            mode,
            fields: Vec::new(),
        }
    }

    /// Composite field with nested columns.
    pub fn record(name: impl Into<String>, mode: Mode, fields: Vec<FieldSchema>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Record,
            mode,
            fields,
        }
    }

    pub fn is_repeated(&self) -> bool {
        self.mode == Mode::Repeated
    }

    pub fn is_required(&self) -> bool {
        self.mode == Mode::Required
    }

    /// The same field viewed as a single array element: identical type and
    /// nested fields, mode `REQUIRED`.
    pub fn element(&self) -> FieldSchema {
        FieldSchema {
            name: self.name.clone(),
            field_type: self.field_type,
            mode: Mode::Required,
            fields: self.fields.clone(),
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  Schema
// ════════════════════════════════════════════════════════════════

/// Ordered column list of a result set.
///
/// Field position in `fields` is the position of the matching cell in every
/// [`Row`](crate::value::Row).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<FieldSchema>,
}

impl Schema {
    pub fn new(fields: Vec<FieldSchema>) -> Self {
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
