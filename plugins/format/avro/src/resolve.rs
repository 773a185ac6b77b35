use apache_avro::Schema;
use apache_avro::types::Value as AvroValue;
use emu_api::EncodeError;

/// Turn the nullable-union mapping tree into concrete Avro union values.
///
/// Under a `["null", T]` schema, `{key: null}` and bare `Null` select the
/// null branch; `{key: v}` and any bare value select `T`. The tree can then
/// be handed to `apache_avro::Writer`. A NULL REPEATED cell (`{key: null}`
/// under an array schema) is written as an empty array.
pub fn resolve(value: AvroValue, schema: &Schema) -> Result<AvroValue, EncodeError> {
    match (value, schema) {
        (AvroValue::Record(fields), Schema::Record(record)) => {
            if fields.len() != record.fields.len() {
                return Err(EncodeError::type_mismatch(format!(
                    "record has {} fields, avro schema '{}' has {}",
                    fields.len(),
                    record.name.name,
                    record.fields.len()
                )));
            }
            fields
                .into_iter()
                .zip(&record.fields)
                .map(|((name, v), field)| {
                    resolve(v, &field.schema)
                        .map_err(|e| e.with_context(&name))
                        .map(|v| (name, v))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(AvroValue::Record)
        }
        (value, Schema::Array(_)) if is_null_branch(&value) => Ok(AvroValue::Array(Vec::new())),
        (AvroValue::Array(items), Schema::Array(array)) => items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| {
                resolve(item, &array.items).map_err(|e| e.with_context(format!("[{idx}]")))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(AvroValue::Array),
        (value, Schema::Union(union)) => {
            let inner = unwrap_branch(value);
            let variants = union.variants();
            let position = if matches!(inner, AvroValue::Null) {
                variants.iter().position(|v| matches!(v, Schema::Null))
            } else {
                variants.iter().position(|v| !matches!(v, Schema::Null))
            };
            let Some(idx) = position else {
                return Err(EncodeError::type_mismatch("no matching union branch"));
            };
            let resolved = resolve(inner, &variants[idx])?;
            Ok(AvroValue::Union(idx as u32, Box::new(resolved)))
        }
        (value, _) => Ok(value),
    }
}

/// Bare `Null` or a `{key: null}` wrapper.
fn is_null_branch(value: &AvroValue) -> bool {
    match value {
        AvroValue::Null => true,
        AvroValue::Map(map) => map.len() == 1 && map.values().all(|v| matches!(v, AvroValue::Null)),
        _ => false,
    }
}

/// `{key: v}` → `v`; everything else unchanged.
fn unwrap_branch(value: AvroValue) -> AvroValue {
    match value {
        AvroValue::Map(map) if map.len() == 1 => {
            map.into_values().next().unwrap_or(AvroValue::Null)
        }
        other => other,
    }
}
