use std::borrow::Cow;
use std::fmt;

use apache_avro::types::Value as AvroValue;
use arrow::record_batch::RecordBatch;
use emu_api::{EncodeError, EncoderConfig, Row, Schema, TimestampText};
use emu_format_avro::AvroEncoder;
use emu_format_json::{JobReference, QueryResponse};

use crate::normalize::normalize;

/// Output channel a result set is encoded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputChannel {
    Rest,
    Avro,
    Arrow,
}

impl fmt::Display for OutputChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputChannel::Rest => "rest",
            OutputChannel::Avro => "avro",
            OutputChannel::Arrow => "arrow",
        })
    }
}

/// Encoded rows, one variant per channel.
#[derive(Debug)]
pub enum Encoded {
    Rest(Vec<serde_json::Map<String, serde_json::Value>>),
    Avro(Vec<AvroValue>),
    Arrow(RecordBatch),
}

/// Schema plus rows checked against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSet {
    schema: Schema,
    rows: Vec<Row>,
}

impl ResultSet {
    /// Validate every row against `schema`; the first bad row is reported
    /// with its index.
    pub fn try_new(schema: Schema, rows: Vec<Row>) -> Result<Self, EncodeError> {
        for (idx, row) in rows.iter().enumerate() {
            row.validate(&schema.fields)
                .map_err(|e| e.with_context(format!("rows[{idx}]")))?;
        }
        Ok(Self { schema, rows })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Apply request options. Rows are normalized here, once, and shared by
    /// every channel encoded from the result.
    pub fn prepare(&self, config: &EncoderConfig) -> PreparedResult<'_> {
        let rows = normalize(
            &self.schema.fields,
            &self.rows,
            config.use_int64_timestamp,
            config.timestamp_compat,
        );
        tracing::debug!(
            rows = self.rows.len(),
            normalized = config.use_int64_timestamp,
            compat = ?config.timestamp_compat,
            "result set prepared"
        );
        PreparedResult {
            schema: &self.schema,
            rows,
            timestamps: config.timestamp_text(),
        }
    }
}

/// Result set after request options were applied.
pub struct PreparedResult<'a> {
    schema: &'a Schema,
    rows: Cow<'a, [Row]>,
    timestamps: TimestampText,
}

impl PreparedResult<'_> {
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn timestamps(&self) -> TimestampText {
        self.timestamps
    }

    pub fn encode(&self, channel: OutputChannel) -> Result<Encoded, EncodeError> {
        tracing::debug!(%channel, rows = self.rows.len(), "encoding result set");
        let fields = &self.schema.fields;
        match channel {
            OutputChannel::Rest => self
                .each_row(|row| emu_format_json::project(fields, row))
                .map(Encoded::Rest),
            OutputChannel::Avro => {
                let encoder = AvroEncoder::new(fields, self.timestamps)?;
                self.each_row(|row| encoder.encode(row)).map(Encoded::Avro)
            }
            OutputChannel::Arrow => {
                emu_format_arrow::record_batch(fields, &self.rows, self.timestamps)
                    .map(Encoded::Arrow)
            }
        }
    }

    /// Avro object container of all rows.
    pub fn avro_container(&self) -> Result<Vec<u8>, EncodeError> {
        AvroEncoder::new(&self.schema.fields, self.timestamps)?.write_container(&self.rows)
    }

    /// REST envelope of a synchronous query call.
    pub fn query_response(&self, job_reference: JobReference) -> QueryResponse {
        QueryResponse::new(job_reference, self.schema.clone(), self.rows.to_vec())
    }

    fn each_row<T>(
        &self,
        mut encode: impl FnMut(&Row) -> Result<T, EncodeError>,
    ) -> Result<Vec<T>, EncodeError> {
        self.rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                tracing::trace!(row = idx, "encode");
                encode(row).map_err(|e| e.with_context(format!("rows[{idx}]")))
            })
            .collect()
    }
}
