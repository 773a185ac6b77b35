//! Bulk export channel: nullable-union record trees for Avro writers.

pub mod encode;
pub mod resolve;
pub mod schema;

use apache_avro::types::Value as AvroValue;
use apache_avro::{Schema, Writer};
use emu_api::{EncodeError, FieldSchema, Row, TimestampText};

pub use encode::{cast, encode_row, type_key};
pub use resolve::resolve;
pub use schema::avro_schema;

/// Default name of the top-level export record.
pub const ROOT_RECORD: &str = "Root";

// ═══════════════════════════════════════════════════════════════
//  AvroEncoder
// ═══════════════════════════════════════════════════════════════

/// Encoder bound to one result schema.
pub struct AvroEncoder {
    fields: Vec<FieldSchema>,
    schema: Schema,
    timestamps: TimestampText,
}

impl AvroEncoder {
    pub fn new(fields: &[FieldSchema], timestamps: TimestampText) -> Result<Self, EncodeError> {
        Self::with_record_name(fields, ROOT_RECORD, timestamps)
    }

    pub fn with_record_name(
        fields: &[FieldSchema],
        record_name: &str,
        timestamps: TimestampText,
    ) -> Result<Self, EncodeError> {
        Ok(Self {
            fields: fields.to_vec(),
            schema: avro_schema(fields, record_name)?,
            timestamps,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Nullable-union mapping tree of one row.
    pub fn encode(&self, row: &Row) -> Result<AvroValue, EncodeError> {
        encode_row(&self.fields, row, self.timestamps)
    }

    /// Row with unions resolved against [`AvroEncoder::schema`].
    pub fn encode_resolved(&self, row: &Row) -> Result<AvroValue, EncodeError> {
        resolve(self.encode(row)?, &self.schema)
    }

    /// Object container file bytes for `rows`. Fails on the first bad row.
    pub fn write_container(&self, rows: &[Row]) -> Result<Vec<u8>, EncodeError> {
        let mut writer = Writer::new(&self.schema, Vec::new());
        for (idx, row) in rows.iter().enumerate() {
            let value = self
                .encode_resolved(row)
                .map_err(|e| e.with_context(format!("rows[{idx}]")))?;
            writer
                .append(value)
                .map_err(|e| EncodeError::Writer(format!("avro append rows[{idx}]: {e}")))?;
        }
        tracing::debug!(rows = rows.len(), "avro container written");
        writer
            .into_inner()
            .map_err(|e| EncodeError::Writer(format!("avro flush: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use apache_avro::Reader;
    use emu_api::{Cell, FieldType, Mode};

    use super::*;

    fn fields() -> Vec<FieldSchema> {
        vec![
            FieldSchema::new("id", FieldType::Int64, Mode::Required),
            FieldSchema::new("t", FieldType::Timestamp, Mode::Nullable),
            FieldSchema::new("tags", FieldType::String, Mode::Repeated),
            FieldSchema::record(
                "addr",
                Mode::Nullable,
                vec![FieldSchema::new("city", FieldType::String, Mode::Nullable)],
            ),
        ]
    }

    fn rows() -> Vec<Row> {
        vec![
            Row::new(vec![
                Cell::scalar("1"),
                Cell::null(),
                Cell::array(vec![Cell::scalar("a"), Cell::scalar("b")]),
                Cell::record(Row::new(vec![Cell::scalar("Oslo")])),
            ]),
            Row::new(vec![
                Cell::scalar("2"),
                Cell::scalar("1672531200"),
                Cell::array(vec![]),
                Cell::null(),
            ]),
        ]
    }

    #[test]
    fn container_round_trip() {
        let encoder = AvroEncoder::new(&fields(), TimestampText::EngineValue).unwrap();
        let bytes = encoder.write_container(&rows()).unwrap();

        let read: Vec<AvroValue> = Reader::new(&bytes[..])
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(read.len(), 2);

        let expected: Vec<AvroValue> = rows()
            .iter()
            .map(|r| encoder.encode_resolved(r).unwrap())
            .collect();
        assert_eq!(read, expected);
    }

    #[test]
    fn null_repeated_cell_round_trips_as_empty_array() {
        let fields = vec![FieldSchema::new("tags", FieldType::String, Mode::Repeated)];
        let encoder = AvroEncoder::new(&fields, TimestampText::EngineValue).unwrap();
        let rows = vec![
            Row::try_new(&fields, vec![Cell::null()]).unwrap(),
            Row::try_new(&fields, vec![Cell::array(vec![Cell::scalar("a")])]).unwrap(),
        ];
        let bytes = encoder.write_container(&rows).unwrap();

        let read: Vec<AvroValue> = Reader::new(&bytes[..])
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            read,
            vec![
                AvroValue::Record(vec![("tags".into(), AvroValue::Array(vec![]))]),
                AvroValue::Record(vec![(
                    "tags".into(),
                    AvroValue::Array(vec![AvroValue::String("a".into())])
                )]),
            ]
        );
    }

    #[test]
    fn encode_end_to_end_example() {
        let fields = vec![
            FieldSchema::new("id", FieldType::Int64, Mode::Required),
            FieldSchema::new("t", FieldType::Timestamp, Mode::Nullable),
        ];
        let encoder = AvroEncoder::new(&fields, TimestampText::IntegerMicros).unwrap();
        let value = encoder
            .encode(&Row::new(vec![Cell::scalar("1"), Cell::null()]))
            .unwrap();

        let AvroValue::Record(record) = value else {
            panic!("expected record");
        };
        assert_eq!(record[0], ("id".to_string(), AvroValue::Long(1)));
        let AvroValue::Map(t) = &record[1].1 else {
            panic!("expected union mapping");
        };
        assert_eq!(t.len(), 1);
        assert_eq!(t.get("long.timestamp-micros"), Some(&AvroValue::Null));
    }

    #[test]
    fn bad_row_index_in_error() {
        let encoder = AvroEncoder::new(&fields(), TimestampText::EngineValue).unwrap();
        let mut rows = rows();
        rows[1] = Row::new(vec![
            Cell::scalar("x"),
            Cell::null(),
            Cell::array(vec![]),
            Cell::null(),
        ]);
        let err = encoder.write_container(&rows).unwrap_err();
        assert_eq!(err.path(), Some("rows[1].id"));
    }
}
