//! REST channel: row projection and response envelopes.

pub mod response;

use emu_api::value::check_width;
use emu_api::{Cell, EncodeError, FieldSchema, Row, Value};

pub use response::{
    GetQueryResultsResponse, JobReference, QueryResponse, TableDataList, TableSchema,
};

/// Flatten a row into `field name → value`.
///
/// Scalars keep their text, NULL is an explicit `null`, structs become
/// nested objects and arrays keep element order. No type coercion.
pub fn project(
    fields: &[FieldSchema],
    row: &Row,
) -> Result<serde_json::Map<String, serde_json::Value>, EncodeError> {
    check_width(row, fields)?;
    let mut map = serde_json::Map::with_capacity(fields.len());
    for (cell, field) in row.cells().iter().zip(fields) {
        let value = project_cell(cell, field).map_err(|e| e.with_context(&field.name))?;
        map.insert(field.name.clone(), value);
    }
    Ok(map)
}

fn project_cell(cell: &Cell, field: &FieldSchema) -> Result<serde_json::Value, EncodeError> {
    match &cell.value {
        Value::Null => Ok(serde_json::Value::Null),
        Value::Scalar(text) => Ok(serde_json::Value::String(text.clone())),
        Value::Struct(row) if field.field_type.is_record() => {
            project(&field.fields, row).map(serde_json::Value::Object)
        }
        Value::Struct(_) => Err(EncodeError::type_mismatch(format!(
            "struct cell for {} field",
            field.field_type
        ))),
        Value::Array(cells) => cells
            .iter()
            .enumerate()
            .map(|(idx, element)| {
                project_element(element, field).map_err(|e| e.with_context(format!("[{idx}]")))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(serde_json::Value::Array),
    }
}

fn project_element(element: &Cell, field: &FieldSchema) -> Result<serde_json::Value, EncodeError> {
    match &element.value {
        Value::Array(_) => Err(EncodeError::type_mismatch("nested arrays are not supported")),
        _ => project_cell(element, field),
    }
}
