use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Fields, Schema, TimeUnit};
use emu_api::text::{NUMERIC_PRECISION, NUMERIC_SCALE};
use emu_api::{FieldSchema, FieldType, Mode};

/// Name of the element field inside list columns.
pub const LIST_ITEM: &str = "item";

/// Arrow schema mirroring `fields`.
///
/// REQUIRED maps to non-nullable, REPEATED to a nullable list of nullable
/// elements, RECORD to a struct of the nested fields.
pub fn arrow_schema(fields: &[FieldSchema]) -> Schema {
    Schema::new(arrow_fields(fields))
}

pub fn arrow_fields(fields: &[FieldSchema]) -> Fields {
    fields.iter().map(arrow_field).collect()
}

pub fn arrow_field(field: &FieldSchema) -> Field {
    match field.mode {
        Mode::Repeated => Field::new(&field.name, DataType::List(Arc::new(item_field(field))), true),
        Mode::Required => Field::new(&field.name, element_type(field), false),
        Mode::Nullable => Field::new(&field.name, element_type(field), true),
    }
}

/// Element field of a REPEATED column.
pub fn item_field(field: &FieldSchema) -> Field {
    Field::new(LIST_ITEM, element_type(field), true)
}

/// Data type of one value of `field`, ignoring its mode.
pub fn element_type(field: &FieldSchema) -> DataType {
    match field.field_type {
        FieldType::Int64 => DataType::Int64,
        FieldType::Float64 => DataType::Float64,
        FieldType::Bool => DataType::Boolean,
        FieldType::Numeric => DataType::Decimal128(NUMERIC_PRECISION as u8, NUMERIC_SCALE as i8),
        FieldType::Bytes => DataType::Binary,
        FieldType::Date => DataType::Date32,
        FieldType::Time => DataType::Time64(TimeUnit::Microsecond),
        FieldType::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
        FieldType::Record => DataType::Struct(arrow_fields(&field.fields)),
        FieldType::BigNumeric
        | FieldType::String
        | FieldType::DateTime
        | FieldType::Geography
        | FieldType::Interval
        | FieldType::Json => DataType::Utf8,
    }
}
