use std::collections::HashMap;

use apache_avro::Decimal;
use apache_avro::types::Value as AvroValue;
use emu_api::text::{
    BIGNUMERIC_PRECISION, BIGNUMERIC_SCALE, NUMERIC_PRECISION, NUMERIC_SCALE, TimestampText,
    parse_bool, parse_bytes, parse_date_days, parse_decimal, parse_float64, parse_int64,
    parse_time_micros, parse_timestamp_micros,
};
use emu_api::value::check_width;
use emu_api::{Cell, EncodeError, FieldSchema, FieldType, Row, Value};
use num_bigint::{BigInt, Sign};

/// Union branch name for a field, following the goavro naming convention
/// (`long`, `long.timestamp-micros`, ...). Records use the field name.
pub fn type_key(field: &FieldSchema) -> String {
    let key = match field.field_type {
        FieldType::Int64 => "long",
        FieldType::Float64 => "double",
        FieldType::Numeric | FieldType::BigNumeric => "bytes.decimal",
        FieldType::Bool => "boolean",
        FieldType::String
        | FieldType::DateTime
        | FieldType::Geography
        | FieldType::Interval
        | FieldType::Json => "string",
        FieldType::Bytes => "bytes",
        FieldType::Date => "int.date",
        FieldType::Time => "long.time-micros",
        FieldType::Timestamp => "long.timestamp-micros",
        FieldType::Record => return field.name.clone(),
    };
    key.to_string()
}

/// Encode a row as an Avro record with nullable-union wrappers.
///
/// Non-required fields become `{type_key: value}` mappings, NULL becomes
/// `{type_key: null}`. Structs are returned bare and arrays keep element
/// order.
pub fn encode_row(
    fields: &[FieldSchema],
    row: &Row,
    timestamps: TimestampText,
) -> Result<AvroValue, EncodeError> {
    check_width(row, fields)?;
    let mut record = Vec::with_capacity(fields.len());
    for (cell, field) in row.cells().iter().zip(fields) {
        let value = encode_cell(cell, field, timestamps).map_err(|e| e.with_context(&field.name))?;
        record.push((field.name.clone(), value));
    }
    Ok(AvroValue::Record(record))
}

fn encode_cell(
    cell: &Cell,
    field: &FieldSchema,
    timestamps: TimestampText,
) -> Result<AvroValue, EncodeError> {
    match &cell.value {
        Value::Struct(row) if field.field_type.is_record() => {
            encode_row(&field.fields, row, timestamps)
        }
        Value::Struct(_) => Err(EncodeError::type_mismatch(format!(
            "struct cell for {} field",
            field.field_type
        ))),
        Value::Array(cells) => {
            let element = field.element();
            cells
                .iter()
                .enumerate()
                .map(|(idx, c)| {
                    encode_element(c, &element, timestamps)
                        .map_err(|e| e.with_context(format!("[{idx}]")))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(AvroValue::Array)
        }
        Value::Null => Ok(nullable(field, AvroValue::Null)),
        Value::Scalar(text) => {
            let value = cast(text, field.field_type, timestamps)?;
            if field.is_required() {
                Ok(value)
            } else {
                Ok(nullable(field, value))
            }
        }
    }
}

fn encode_element(
    cell: &Cell,
    element: &FieldSchema,
    timestamps: TimestampText,
) -> Result<AvroValue, EncodeError> {
    match &cell.value {
        Value::Null => Err(EncodeError::type_mismatch("NULL element in REPEATED field")),
        Value::Array(_) => Err(EncodeError::type_mismatch("nested arrays are not supported")),
        _ => encode_cell(cell, element, timestamps),
    }
}

fn nullable(field: &FieldSchema, value: AvroValue) -> AvroValue {
    AvroValue::Map(HashMap::from([(type_key(field), value)]))
}

/// Parse scalar text into the Avro value of the declared type.
pub fn cast(
    text: &str,
    field_type: FieldType,
    timestamps: TimestampText,
) -> Result<AvroValue, EncodeError> {
    let value = match field_type {
        FieldType::Int64 => AvroValue::Long(parse_int64(text)?),
        FieldType::Float64 => AvroValue::Double(parse_float64(text)?),
        FieldType::Numeric => {
            decimal(parse_decimal(text, field_type, NUMERIC_PRECISION, NUMERIC_SCALE)?, 16)
        }
        FieldType::BigNumeric => {
            decimal(
                parse_decimal(text, field_type, BIGNUMERIC_PRECISION, BIGNUMERIC_SCALE)?,
                32,
            )
        }
        FieldType::Bool => AvroValue::Boolean(parse_bool(text)?),
        FieldType::String
        | FieldType::DateTime
        | FieldType::Geography
        | FieldType::Interval
        | FieldType::Json => AvroValue::String(text.to_string()),
        FieldType::Bytes => AvroValue::Bytes(parse_bytes(text)?),
        FieldType::Date => AvroValue::Date(parse_date_days(text)?),
        FieldType::Time => AvroValue::TimeMicros(parse_time_micros(text)?),
        FieldType::Timestamp => {
            AvroValue::TimestampMicros(parse_timestamp_micros(text, timestamps)?)
        }
        FieldType::Record => {
            return Err(EncodeError::type_mismatch("scalar cell for RECORD field"));
        }
    };
    Ok(value)
}

/// Big-endian two's complement, sign-extended to `width` bytes so the
/// encoded length always covers the declared precision.
fn decimal(unscaled: BigInt, width: usize) -> AvroValue {
    let mut bytes = unscaled.to_signed_bytes_be();
    if bytes.len() < width {
        let fill = if unscaled.sign() == Sign::Minus { 0xFF } else { 0x00 };
        let mut padded = vec![fill; width - bytes.len()];
        padded.append(&mut bytes);
        bytes = padded;
    }
    AvroValue::Decimal(Decimal::from(bytes))
}

#[cfg(test)]
mod tests {
    use emu_api::Mode;

    use super::*;

    fn field(name: &str, field_type: FieldType, mode: Mode) -> FieldSchema {
        FieldSchema::new(name, field_type, mode)
    }

    fn wrapped(key: &str, value: AvroValue) -> AvroValue {
        AvroValue::Map(HashMap::from([(key.to_string(), value)]))
    }

    fn encode(fields: &[FieldSchema], cells: Vec<Cell>) -> Result<AvroValue, EncodeError> {
        encode_row(fields, &Row::new(cells), TimestampText::EngineValue)
    }

    #[test]
    fn required_int_is_bare() {
        let fields = [field("n", FieldType::Int64, Mode::Required)];
        let value = encode(&fields, vec![Cell::scalar("42")]).unwrap();
        assert_eq!(value, AvroValue::Record(vec![("n".into(), AvroValue::Long(42))]));
    }

    #[test]
    fn nullable_int_is_wrapped() {
        let fields = [field("n", FieldType::Int64, Mode::Nullable)];
        let value = encode(&fields, vec![Cell::scalar("42")]).unwrap();
        assert_eq!(
            value,
            AvroValue::Record(vec![("n".into(), wrapped("long", AvroValue::Long(42)))])
        );
    }

    #[test]
    fn null_selects_null_branch() {
        let fields = [
            field("id", FieldType::Int64, Mode::Required),
            field("t", FieldType::Timestamp, Mode::Nullable),
        ];
        let value = encode(&fields, vec![Cell::scalar("1"), Cell::null()]).unwrap();
        assert_eq!(
            value,
            AvroValue::Record(vec![
                ("id".into(), AvroValue::Long(1)),
                ("t".into(), wrapped("long.timestamp-micros", AvroValue::Null)),
            ])
        );
    }

    #[test]
    fn repeated_records_keep_order() {
        let fields = [FieldSchema::record(
            "items",
            Mode::Repeated,
            vec![field("sku", FieldType::String, Mode::Required)],
        )];
        let value = encode(
            &fields,
            vec![Cell::array(vec![
                Cell::record(Row::new(vec![Cell::scalar("b")])),
                Cell::record(Row::new(vec![Cell::scalar("a")])),
            ])],
        )
        .unwrap();
        assert_eq!(
            value,
            AvroValue::Record(vec![(
                "items".into(),
                AvroValue::Array(vec![
                    AvroValue::Record(vec![("sku".into(), AvroValue::String("b".into()))]),
                    AvroValue::Record(vec![("sku".into(), AvroValue::String("a".into()))]),
                ])
            )])
        );
    }

    #[test]
    fn repeated_scalars_are_unwrapped() {
        let fields = [field("tags", FieldType::Int64, Mode::Repeated)];
        let value = encode(
            &fields,
            vec![Cell::array(vec![Cell::scalar("3"), Cell::scalar("1")])],
        )
        .unwrap();
        assert_eq!(
            value,
            AvroValue::Record(vec![(
                "tags".into(),
                AvroValue::Array(vec![AvroValue::Long(3), AvroValue::Long(1)])
            )])
        );
    }

    #[test]
    fn nullable_struct_is_not_wrapped_but_its_null_is() {
        let fields = [FieldSchema::record(
            "addr",
            Mode::Nullable,
            vec![field("city", FieldType::String, Mode::Nullable)],
        )];
        let present = encode(
            &fields,
            vec![Cell::record(Row::new(vec![Cell::scalar("Oslo")]))],
        )
        .unwrap();
        assert_eq!(
            present,
            AvroValue::Record(vec![(
                "addr".into(),
                AvroValue::Record(vec![(
                    "city".into(),
                    wrapped("string", AvroValue::String("Oslo".into()))
                )])
            )])
        );

        let absent = encode(&fields, vec![Cell::null()]).unwrap();
        assert_eq!(
            absent,
            AvroValue::Record(vec![("addr".into(), wrapped("addr", AvroValue::Null))])
        );
    }

    #[test]
    fn cast_failure_carries_path() {
        let fields = [FieldSchema::record(
            "addr",
            Mode::Required,
            vec![field("zip", FieldType::Int64, Mode::Required)],
        )];
        let err = encode(
            &fields,
            vec![Cell::record(Row::new(vec![Cell::scalar("N/A")]))],
        )
        .unwrap_err();
        assert!(matches!(err, EncodeError::CastFailure { .. }));
        assert_eq!(err.path(), Some("addr.zip"));
    }

    #[test]
    fn scalar_casts() {
        let ts = TimestampText::EngineValue;
        assert_eq!(cast("1.5", FieldType::Float64, ts).unwrap(), AvroValue::Double(1.5));
        assert_eq!(cast("true", FieldType::Bool, ts).unwrap(), AvroValue::Boolean(true));
        assert_eq!(cast("1970-01-11", FieldType::Date, ts).unwrap(), AvroValue::Date(10));
        assert_eq!(
            cast("00:00:02", FieldType::Time, ts).unwrap(),
            AvroValue::TimeMicros(2_000_000)
        );
        assert_eq!(
            cast("1672531200", FieldType::Timestamp, ts).unwrap(),
            AvroValue::TimestampMicros(1_672_531_200_000_000)
        );
        assert_eq!(
            cast("1672531200000000", FieldType::Timestamp, TimestampText::IntegerMicros).unwrap(),
            AvroValue::TimestampMicros(1_672_531_200_000_000)
        );
        assert_eq!(
            cast("aGk=", FieldType::Bytes, ts).unwrap(),
            AvroValue::Bytes(b"hi".to_vec())
        );
        assert_eq!(
            cast("2023-01-01T10:00:00", FieldType::DateTime, ts).unwrap(),
            AvroValue::String("2023-01-01T10:00:00".into())
        );
    }

    #[test]
    fn numeric_is_sign_extended() {
        let AvroValue::Decimal(d) = cast("-1", FieldType::Numeric, TimestampText::EngineValue)
            .unwrap()
        else {
            panic!("expected decimal");
        };
        let bytes: Vec<u8> = (&d).try_into().unwrap();
        assert_eq!(bytes, vec![0xFF; 16]);
    }

    #[test]
    fn decimal_overflowing_precision_is_cast_failure() {
        let ts = TimestampText::EngineValue;
        let over_numeric = format!("1{}", "0".repeat(40));
        assert!(matches!(
            cast(&over_numeric, FieldType::Numeric, ts),
            Err(EncodeError::CastFailure { .. })
        ));
        assert!(cast(&"9".repeat(29), FieldType::Numeric, ts).is_ok());

        let over_big = format!("1{}", "0".repeat(38));
        assert!(matches!(
            cast(&over_big, FieldType::BigNumeric, ts),
            Err(EncodeError::CastFailure { .. })
        ));
        let AvroValue::Decimal(d) = cast(&"9".repeat(38), FieldType::BigNumeric, ts).unwrap()
        else {
            panic!("expected decimal");
        };
        let bytes: Vec<u8> = (&d).try_into().unwrap();
        assert_eq!(bytes.len(), 32);
    }

    #[test]
    fn null_element_is_rejected() {
        let fields = [field("tags", FieldType::String, Mode::Repeated)];
        let err = encode(&fields, vec![Cell::array(vec![Cell::null()])]).unwrap_err();
        assert!(matches!(err, EncodeError::TypeMismatch { .. }));
        assert_eq!(err.path(), Some("tags[0]"));
    }
}
