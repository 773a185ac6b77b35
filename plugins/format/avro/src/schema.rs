use apache_avro::Schema;
use emu_api::text::{BIGNUMERIC_PRECISION, BIGNUMERIC_SCALE, NUMERIC_PRECISION, NUMERIC_SCALE};
use emu_api::{EncodeError, FieldSchema, FieldType, Mode};
use serde_json::json;

/// Derive the Avro record schema of a result set.
///
/// Nullable fields become `["null", T]`, repeated fields arrays of `T`.
/// Nested records are namespaced by their parent path so two structs with
/// the same field name never collide.
pub fn avro_schema(fields: &[FieldSchema], record_name: &str) -> Result<Schema, EncodeError> {
    let json = record_json(record_name, None, fields);
    Schema::parse(&json).map_err(|e| EncodeError::Writer(format!("avro schema: {e}")))
}

fn record_json(name: &str, namespace: Option<&str>, fields: &[FieldSchema]) -> serde_json::Value {
    let child_namespace = match namespace {
        Some(ns) => format!("{ns}.{name}"),
        None => name.to_string(),
    };
    let fields: Vec<serde_json::Value> = fields
        .iter()
        .map(|f| json!({ "name": f.name, "type": field_json(f, &child_namespace) }))
        .collect();

    let mut record = json!({ "type": "record", "name": name, "fields": fields });
    if let Some(ns) = namespace {
        record["namespace"] = json!(ns);
    }
    record
}

fn field_json(field: &FieldSchema, namespace: &str) -> serde_json::Value {
    let base = type_json(field, namespace);
    match field.mode {
        Mode::Required => base,
        Mode::Nullable => json!(["null", base]),
        Mode::Repeated => json!({ "type": "array", "items": base }),
    }
}

fn type_json(field: &FieldSchema, namespace: &str) -> serde_json::Value {
    match field.field_type {
        FieldType::Int64 => json!("long"),
        FieldType::Float64 => json!("double"),
        FieldType::Numeric => json!({
            "type": "bytes",
            "logicalType": "decimal",
            "precision": NUMERIC_PRECISION,
            "scale": NUMERIC_SCALE,
        }),
        FieldType::BigNumeric => json!({
            "type": "bytes",
            "logicalType": "decimal",
            "precision": BIGNUMERIC_PRECISION,
            "scale": BIGNUMERIC_SCALE,
        }),
        FieldType::Bool => json!("boolean"),
        FieldType::String | FieldType::Geography | FieldType::Interval | FieldType::Json => {
            json!("string")
        }
        FieldType::DateTime => json!({ "type": "string", "sqlType": "DATETIME" }),
        FieldType::Bytes => json!("bytes"),
        FieldType::Date => json!({ "type": "int", "logicalType": "date" }),
        FieldType::Time => json!({ "type": "long", "logicalType": "time-micros" }),
        FieldType::Timestamp => json!({ "type": "long", "logicalType": "timestamp-micros" }),
        FieldType::Record => record_json(&field.name, Some(namespace), &field.fields),
    }
}
