use std::borrow::Cow;

use emu_api::text::{datetime_literal_micros, engine_seconds_to_micros};
use emu_api::{Cell, FieldSchema, FieldType, Row, TimestampCompat, Value};

/// Rewrite every TIMESTAMP leaf to integer microseconds since epoch.
///
/// Disabled returns the input borrowed. Enabled returns freshly built rows;
/// the input is never touched. Text that no parser accepts becomes epoch
/// zero, so this never fails.
pub fn normalize<'a>(
    fields: &[FieldSchema],
    rows: &'a [Row],
    enabled: bool,
    compat: TimestampCompat,
) -> Cow<'a, [Row]> {
    if !enabled {
        return Cow::Borrowed(rows);
    }
    Cow::Owned(rows.iter().map(|row| normalize_row(fields, row, compat)).collect())
}

fn normalize_row(fields: &[FieldSchema], row: &Row, compat: TimestampCompat) -> Row {
    let cells = row
        .cells()
        .iter()
        .enumerate()
        .map(|(idx, cell)| match fields.get(idx) {
            Some(field) => normalize_cell(field, cell, compat),
            None => cell.clone(),
        })
        .collect();
    Row::new(cells)
}

fn normalize_cell(field: &FieldSchema, cell: &Cell, compat: TimestampCompat) -> Cell {
    match (&cell.value, field.field_type) {
        (Value::Scalar(text), FieldType::Timestamp) if !field.is_repeated() => {
            Cell::scalar(micros_text(text, engine_value_micros, &field.name)).named(&field.name)
        }
        (Value::Array(elements), FieldType::Timestamp) => Cell {
            value: Value::Array(
                elements
                    .iter()
                    .map(|element| normalize_element(field, element, compat))
                    .collect(),
            ),
            name: cell.name.clone(),
        },
        (Value::Struct(row), FieldType::Record) => Cell {
            value: Value::Struct(normalize_row(&field.fields, row, compat)),
            name: cell.name.clone(),
        },
        (Value::Array(elements), FieldType::Record) => Cell {
            value: Value::Array(
                elements
                    .iter()
                    .map(|element| match &element.value {
                        Value::Struct(row) => Cell {
                            value: Value::Struct(normalize_row(&field.fields, row, compat)),
                            name: element.name.clone(),
                        },
                        _ => element.clone(),
                    })
                    .collect(),
            ),
            name: cell.name.clone(),
        },
        _ => cell.clone(),
    }
}

fn normalize_element(field: &FieldSchema, element: &Cell, compat: TimestampCompat) -> Cell {
    let Value::Scalar(text) = &element.value else {
        return element.clone();
    };
    match compat {
        TimestampCompat::Legacy => {
            Cell::scalar(micros_text(text, datetime_literal_micros, &field.name))
        }
        TimestampCompat::Unified => {
            Cell::scalar(micros_text(text, engine_value_micros, &field.name)).named(&field.name)
        }
    }
}

/// Numeric engine value first, then the offset date-time literal.
fn engine_value_micros(text: &str) -> Option<i64> {
    text.parse::<f64>()
        .ok()
        .and_then(engine_seconds_to_micros)
        .or_else(|| datetime_literal_micros(text))
}

fn micros_text(text: &str, parse: fn(&str) -> Option<i64>, field: &str) -> String {
    match parse(text.trim()) {
        Some(micros) => micros.to_string(),
        None => {
            tracing::debug!(field = %field, text = %text, "unparseable timestamp, using epoch");
            "0".to_string()
        }
    }
}
