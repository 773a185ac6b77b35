use arrow::datatypes::Fields;
use emu_api::{Cell, EncodeError, Row, Value};

use crate::builder::{ColumnBuilder, RecordBuilder};

/// Append one row into a pre-shaped record builder.
///
/// Cells go in positionally. Nothing is rolled back on failure: columns
/// before the failing position keep the value appended for this row.
pub fn append_row(row: &Row, builder: &mut RecordBuilder) -> Result<(), EncodeError> {
    let (fields, columns) = builder.parts_mut();
    append_fields(row.cells(), fields, columns)?;
    builder.row_appended();
    Ok(())
}

fn append_fields(
    cells: &[Cell],
    fields: &Fields,
    columns: &mut [ColumnBuilder],
) -> Result<(), EncodeError> {
    if cells.len() != columns.len() {
        return Err(EncodeError::shape(
            format!("{} columns", columns.len()),
            format!("{} cells", cells.len()),
        ));
    }
    for ((cell, column), field) in cells.iter().zip(columns.iter_mut()).zip(fields.iter()) {
        append_cell(cell, column).map_err(|e| e.with_context(field.name()))?;
    }
    Ok(())
}

/// Append one cell, dispatching on the cell's shape.
pub fn append_cell(cell: &Cell, builder: &mut ColumnBuilder) -> Result<(), EncodeError> {
    match (&cell.value, builder) {
        (Value::Null, builder) => {
            builder.append_null();
            Ok(())
        }
        (Value::Scalar(text), ColumnBuilder::Scalar(scalar)) => scalar.append_text(text),
        (Value::Struct(row), ColumnBuilder::Struct(column)) => {
            column.append(true);
            let (fields, children) = column.parts_mut();
            append_fields(row.cells(), fields, children)
        }
        (Value::Array(elements), ColumnBuilder::List(list)) => {
            for (idx, element) in elements.iter().enumerate() {
                list.append_element();
                append_element(element, list.values_mut())
                    .map_err(|e| e.with_context(format!("[{idx}]")))?;
            }
            list.close(true);
            Ok(())
        }
        (value, builder) => Err(EncodeError::shape(builder.kind(), value_kind(value))),
    }
}

fn append_element(element: &Cell, values: &mut ColumnBuilder) -> Result<(), EncodeError> {
    match element.value {
        Value::Array(_) => Err(EncodeError::type_mismatch("nested array inside array")),
        Value::Null => Err(EncodeError::type_mismatch("NULL element in REPEATED field")),
        _ => append_cell(element, values),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Scalar(_) => "scalar",
        Value::Struct(_) => "struct",
        Value::Array(_) => "array",
    }
}
