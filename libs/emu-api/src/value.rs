use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::EncodeError;
use crate::schema::FieldSchema;

/// Value held by a [`Cell`].
///
/// Strategy by shape:
/// - Scalars are always text in the engine's canonical form, whatever the
///   declared type; encoders parse lazily.
/// - `Struct` only for non-repeated `RECORD` fields.
/// - `Array` only for `REPEATED` fields; elements are never `Array`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Scalar(String),
    Struct(Row),
    Array(Vec<Cell>),
}

/// One field's value within a row.
///
/// `name` is diagnostic only. Position in the row, not the name, decides
/// which field a cell belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub value: Value,
    pub name: Option<String>,
}

impl Cell {
    pub fn new(value: Value) -> Self {
        Self { value, name: None }
    }

    pub fn null() -> Self {
        Self::new(Value::Null)
    }

    pub fn scalar(text: impl Into<String>) -> Self {
        Self::new(Value::Scalar(text.into()))
    }

    pub fn record(row: Row) -> Self {
        Self::new(Value::Struct(row))
    }

    pub fn array(cells: Vec<Cell>) -> Self {
        Self::new(Value::Array(cells))
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, Value::Null)
    }

    /// Text bytes carried by this cell and everything below it.
    pub fn byte_size(&self) -> usize {
        match &self.value {
            Value::Null => 0,
            Value::Scalar(text) => text.len(),
            Value::Struct(row) => row.byte_size(),
            Value::Array(cells) => cells.iter().map(Cell::byte_size).sum(),
        }
    }

    /// Parse the REST wire form `{"v": ...}`.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, EncodeError> {
        let serde_json::Value::Object(map) = json else {
            return Err(EncodeError::type_mismatch(format!(
                "expected cell object {{\"v\": ...}}, got {json}"
            )));
        };
        let value = match map.get("v") {
            None | Some(serde_json::Value::Null) => Value::Null,
            Some(serde_json::Value::String(s)) => Value::Scalar(s.clone()),
            Some(serde_json::Value::Number(n)) => Value::Scalar(n.to_string()),
            Some(serde_json::Value::Bool(b)) => Value::Scalar(b.to_string()),
            Some(obj @ serde_json::Value::Object(_)) => Value::Struct(Row::from_json(obj)?),
            Some(serde_json::Value::Array(items)) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(idx, item)| {
                        Cell::from_json(item).map_err(|e| e.with_context(format!("[{idx}]")))
                    })
                    .collect::<Result<_, _>>()?,
            ),
        };
        Ok(Cell::new(value))
    }
}

/// Positional sequence of cells. Order matches `Schema.fields`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row(pub Vec<Cell>);

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self(cells)
    }

    /// Build a row and check it against `fields` in one step.
    pub fn try_new(fields: &[FieldSchema], cells: Vec<Cell>) -> Result<Self, EncodeError> {
        let row = Self(cells);
        row.validate(fields)?;
        Ok(row)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn byte_size(&self) -> usize {
        self.0.iter().map(Cell::byte_size).sum()
    }

    /// Check the positional invariant and every cell's shape, recursively.
    pub fn validate(&self, fields: &[FieldSchema]) -> Result<(), EncodeError> {
        check_width(self, fields)?;
        for (cell, field) in self.0.iter().zip(fields) {
            validate_cell(cell, field).map_err(|e| e.with_context(&field.name))?;
        }
        Ok(())
    }

    /// Parse the REST wire form `{"f": [...]}`.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, EncodeError> {
        match json.get("f") {
            None | Some(serde_json::Value::Null) => Ok(Row::default()),
            Some(serde_json::Value::Array(cells)) => cells
                .iter()
                .enumerate()
                .map(|(idx, cell)| {
                    Cell::from_json(cell).map_err(|e| e.with_context(format!("[{idx}]")))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Row),
            Some(other) => Err(EncodeError::type_mismatch(format!(
                "expected row field list, got {other}"
            ))),
        }
    }
}

/// Row width must equal the field count.
pub fn check_width(row: &Row, fields: &[FieldSchema]) -> Result<(), EncodeError> {
    if row.len() != fields.len() {
        return Err(EncodeError::type_mismatch(format!(
            "row has {} cells but schema has {} fields",
            row.len(),
            fields.len()
        )));
    }
    Ok(())
}

fn validate_cell(cell: &Cell, field: &FieldSchema) -> Result<(), EncodeError> {
    match (&cell.value, field.is_repeated()) {
        (Value::Null, _) => Ok(()),
        (Value::Array(items), true) => {
            for (idx, item) in items.iter().enumerate() {
                validate_element(&item.value, field)
                    .map_err(|e| e.with_context(format!("[{idx}]")))?;
            }
            Ok(())
        }
        (Value::Array(_), false) => Err(EncodeError::type_mismatch(format!(
            "array cell for {} field",
            field.mode
        ))),
        (_, true) => Err(EncodeError::type_mismatch("REPEATED field expects an array cell")),
        (value, false) => validate_single(value, field),
    }
}

/// Arrays never hold NULL; a NULL array is a `Null` cell instead.
fn validate_element(value: &Value, field: &FieldSchema) -> Result<(), EncodeError> {
    match value {
        Value::Null => Err(EncodeError::type_mismatch("NULL element in REPEATED field")),
        value => validate_single(value, field),
    }
}

fn validate_single(value: &Value, field: &FieldSchema) -> Result<(), EncodeError> {
    match value {
        Value::Null => Ok(()),
        Value::Scalar(_) if field.field_type.is_record() => Err(EncodeError::type_mismatch(
            "scalar cell for RECORD field",
        )),
        Value::Scalar(_) => Ok(()),
        Value::Struct(row) if field.field_type.is_record() => row.validate(&field.fields),
        Value::Struct(_) => Err(EncodeError::type_mismatch(format!(
            "struct cell for {} field",
            field.field_type
        ))),
        Value::Array(_) => Err(EncodeError::type_mismatch("nested arrays are not supported")),
    }
}

// ════════════════════════════════════════════════════════════════
//  REST wire form
// ════════════════════════════════════════════════════════════════

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Scalar(text) => serializer.serialize_str(text),
            Value::Struct(row) => row.serialize(serializer),
            Value::Array(cells) => {
                let mut seq = serializer.serialize_seq(Some(cells.len()))?;
                for cell in cells {
                    seq.serialize_element(cell)?;
                }
                seq.end()
            }
        }
    }
}

/// `{"v": value}`; NULL stays an explicit `null`.
impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("v", &self.value)?;
        map.end()
    }
}

/// `{"f": [cells]}`, field list omitted when empty.
impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.is_empty() {
            return serializer.serialize_map(Some(0))?.end();
        }
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("f", &self.0)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Row::from_json(&json).map_err(serde::de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Cell::from_json(&json).map_err(serde::de::Error::custom)
    }
}
