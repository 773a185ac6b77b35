//! Columnar export channel: appends rows into arrow-rs builders.
//!
//! The builder tree is an enum mirroring the schema (scalar, struct, list),
//! so appends dispatch on variants instead of downcasting `dyn ArrayBuilder`.

pub mod append;
pub mod builder;
pub mod schema;

use arrow::record_batch::RecordBatch;
use emu_api::{EncodeError, FieldSchema, Row, TimestampText};

pub use append::{append_cell, append_row};
pub use builder::{ColumnBuilder, ListColumn, RecordBuilder, ScalarBuilder, StructColumn};
pub use schema::{arrow_field, arrow_schema};

/// Append every row into a fresh builder and finish it. Fails on the first
/// bad row.
pub fn record_batch(
    fields: &[FieldSchema],
    rows: &[Row],
    timestamps: TimestampText,
) -> Result<RecordBatch, EncodeError> {
    let mut builder = RecordBuilder::new(fields, timestamps);
    for (idx, row) in rows.iter().enumerate() {
        tracing::trace!(row = idx, "arrow append");
        append_row(row, &mut builder).map_err(|e| e.with_context(format!("rows[{idx}]")))?;
    }
    let batch = builder.finish()?;
    tracing::debug!(rows = batch.num_rows(), columns = batch.num_columns(), "arrow batch built");
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use arrow::array::AsArray;
    use arrow::datatypes::{Decimal128Type, Int64Type};
    use emu_api::{Cell, FieldType, Mode};

    use super::*;

    #[test]
    fn batch_of_typed_columns() {
        let fields = vec![
            FieldSchema::new("id", FieldType::Int64, Mode::Required),
            FieldSchema::new("price", FieldType::Numeric, Mode::Nullable),
            FieldSchema::new("ok", FieldType::Bool, Mode::Nullable),
            FieldSchema::new("d", FieldType::Date, Mode::Nullable),
            FieldSchema::new("big", FieldType::BigNumeric, Mode::Nullable),
        ];
        let rows = vec![
            Row::new(vec![
                Cell::scalar("1"),
                Cell::scalar("12.5"),
                Cell::scalar("true"),
                Cell::scalar("1970-01-03"),
                Cell::scalar("1.5"),
            ]),
            Row::new(vec![
                Cell::scalar("2"),
                Cell::null(),
                Cell::null(),
                Cell::null(),
                Cell::null(),
            ]),
        ];
        let batch = record_batch(&fields, &rows, TimestampText::EngineValue).unwrap();

        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().as_ref(), &arrow_schema(&fields));
        assert_eq!(batch.column(0).as_primitive::<Int64Type>().value(1), 2);
        assert_eq!(
            batch.column(1).as_primitive::<Decimal128Type>().value(0),
            12_500_000_000
        );
        assert!(batch.column(2).as_boolean().value(0));
        assert_eq!(
            batch
                .column(3)
                .as_primitive::<arrow::datatypes::Date32Type>()
                .value(0),
            2
        );
        assert_eq!(batch.column(4).as_string::<i32>().value(0), "1.5");
    }

    #[test]
    fn numeric_beyond_precision_is_cast_failure() {
        let fields = vec![FieldSchema::new("price", FieldType::Numeric, Mode::Nullable)];
        let fits_i128 = Row::new(vec![Cell::scalar(format!("1{}", "0".repeat(29)))]);
        let err = record_batch(&fields, &[fits_i128], TimestampText::EngineValue).unwrap_err();
        assert!(matches!(err, EncodeError::CastFailure { .. }));
        assert_eq!(err.path(), Some("rows[0].price"));

        let max = Row::new(vec![Cell::scalar("9".repeat(29))]);
        assert!(record_batch(&fields, &[max], TimestampText::EngineValue).is_ok());
    }

    #[test]
    fn empty_schema_encodes() {
        let rows = vec![Row::default(), Row::default()];
        let batch = record_batch(&[], &rows, TimestampText::EngineValue).unwrap();
        assert_eq!(batch.num_columns(), 0);
        assert_eq!(batch.num_rows(), 2);

        let batch = record_batch(&[], &[], TimestampText::EngineValue).unwrap();
        assert_eq!(batch.num_rows(), 0);
    }

    #[test]
    fn bad_row_index_in_error() {
        let fields = vec![FieldSchema::new("id", FieldType::Int64, Mode::Required)];
        let rows = vec![Row::new(vec![Cell::scalar("1")]), Row::new(vec![Cell::scalar("x")])];
        let err = record_batch(&fields, &rows, TimestampText::EngineValue).unwrap_err();
        assert_eq!(err.path(), Some("rows[1].id"));
    }
}
