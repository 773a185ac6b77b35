use std::sync::Arc;

use arrow::array::{
    ArrayBuilder, ArrayRef, BinaryBuilder, BooleanBufferBuilder, BooleanBuilder, Date32Builder,
    Decimal128Builder, Float64Builder, Int64Builder, ListArray, StringBuilder, StructArray,
    Time64MicrosecondBuilder, TimestampMicrosecondBuilder,
};
use arrow::buffer::{NullBuffer, OffsetBuffer, ScalarBuffer};
use arrow::datatypes::{DataType, FieldRef, Fields, SchemaRef};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use emu_api::text::{self, NUMERIC_PRECISION, NUMERIC_SCALE, TimestampText, parse_timestamp_micros};
use emu_api::{EncodeError, FieldSchema, FieldType};

use crate::schema::{arrow_fields, arrow_schema, item_field};

// ═══════════════════════════════════════════════════════════════
//  Scalar builders
// ═══════════════════════════════════════════════════════════════

/// Leaf column. The variant decides how scalar text is parsed.
pub enum ScalarBuilder {
    Boolean(BooleanBuilder),
    Int64(Int64Builder),
    Float64(Float64Builder),
    Decimal128(Decimal128Builder),
    Utf8(StringBuilder),
    Binary(BinaryBuilder),
    Date32(Date32Builder),
    Time64(Time64MicrosecondBuilder),
    Timestamp(TimestampMicrosecondBuilder, TimestampText),
}

impl ScalarBuilder {
    pub fn for_type(field_type: FieldType, timestamps: TimestampText) -> Self {
        match field_type {
            FieldType::Int64 => ScalarBuilder::Int64(Int64Builder::new()),
            FieldType::Float64 => ScalarBuilder::Float64(Float64Builder::new()),
            FieldType::Bool => ScalarBuilder::Boolean(BooleanBuilder::new()),
            FieldType::Numeric => ScalarBuilder::Decimal128(
                Decimal128Builder::new().with_data_type(DataType::Decimal128(
                    NUMERIC_PRECISION as u8,
                    NUMERIC_SCALE as i8,
                )),
            ),
            FieldType::Bytes => ScalarBuilder::Binary(BinaryBuilder::new()),
            FieldType::Date => ScalarBuilder::Date32(Date32Builder::new()),
            FieldType::Time => ScalarBuilder::Time64(Time64MicrosecondBuilder::new()),
            FieldType::Timestamp => ScalarBuilder::Timestamp(
                TimestampMicrosecondBuilder::new().with_timezone("UTC"),
                timestamps,
            ),
            FieldType::BigNumeric
            | FieldType::String
            | FieldType::DateTime
            | FieldType::Geography
            | FieldType::Interval
            | FieldType::Json
            | FieldType::Record => ScalarBuilder::Utf8(StringBuilder::new()),
        }
    }

    /// Cast `text` into this builder's native type and append it.
    pub fn append_text(&mut self, text: &str) -> Result<(), EncodeError> {
        match self {
            ScalarBuilder::Boolean(b) => b.append_value(text::parse_bool(text)?),
            ScalarBuilder::Int64(b) => b.append_value(text::parse_int64(text)?),
            ScalarBuilder::Float64(b) => b.append_value(text::parse_float64(text)?),
            ScalarBuilder::Decimal128(b) => {
                let unscaled = text::parse_decimal(
                    text,
                    FieldType::Numeric,
                    NUMERIC_PRECISION,
                    NUMERIC_SCALE,
                )?;
                let value = i128::try_from(&unscaled)
                    .map_err(|e| EncodeError::cast(FieldType::Numeric, text, e))?;
                b.append_value(value);
            }
            ScalarBuilder::Utf8(b) => b.append_value(text),
            ScalarBuilder::Binary(b) => b.append_value(text::parse_bytes(text)?),
            ScalarBuilder::Date32(b) => b.append_value(text::parse_date_days(text)?),
            ScalarBuilder::Time64(b) => b.append_value(text::parse_time_micros(text)?),
            ScalarBuilder::Timestamp(b, form) => {
                b.append_value(parse_timestamp_micros(text, *form)?);
            }
        }
        Ok(())
    }

    pub fn append_null(&mut self) {
        match self {
            ScalarBuilder::Boolean(b) => b.append_null(),
            ScalarBuilder::Int64(b) => b.append_null(),
            ScalarBuilder::Float64(b) => b.append_null(),
            ScalarBuilder::Decimal128(b) => b.append_null(),
            ScalarBuilder::Utf8(b) => b.append_null(),
            ScalarBuilder::Binary(b) => b.append_null(),
            ScalarBuilder::Date32(b) => b.append_null(),
            ScalarBuilder::Time64(b) => b.append_null(),
            ScalarBuilder::Timestamp(b, _) => b.append_null(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ScalarBuilder::Boolean(b) => b.len(),
            ScalarBuilder::Int64(b) => b.len(),
            ScalarBuilder::Float64(b) => b.len(),
            ScalarBuilder::Decimal128(b) => b.len(),
            ScalarBuilder::Utf8(b) => b.len(),
            ScalarBuilder::Binary(b) => b.len(),
            ScalarBuilder::Date32(b) => b.len(),
            ScalarBuilder::Time64(b) => b.len(),
            ScalarBuilder::Timestamp(b, _) => b.len(),
        }
    }

    pub fn finish(&mut self) -> ArrayRef {
        match self {
            ScalarBuilder::Boolean(b) => Arc::new(b.finish()),
            ScalarBuilder::Int64(b) => Arc::new(b.finish()),
            ScalarBuilder::Float64(b) => Arc::new(b.finish()),
            ScalarBuilder::Decimal128(b) => Arc::new(b.finish()),
            ScalarBuilder::Utf8(b) => Arc::new(b.finish()),
            ScalarBuilder::Binary(b) => Arc::new(b.finish()),
            ScalarBuilder::Date32(b) => Arc::new(b.finish()),
            ScalarBuilder::Time64(b) => Arc::new(b.finish()),
            ScalarBuilder::Timestamp(b, _) => Arc::new(b.finish()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Struct / list builders
// ═══════════════════════════════════════════════════════════════

pub struct StructColumn {
    fields: Fields,
    children: Vec<ColumnBuilder>,
    validity: BooleanBufferBuilder,
}

impl StructColumn {
    pub fn new(fields: &[FieldSchema], timestamps: TimestampText) -> Self {
        Self {
            fields: arrow_fields(fields),
            children: fields
                .iter()
                .map(|f| ColumnBuilder::for_field(f, timestamps))
                .collect(),
            validity: BooleanBufferBuilder::new(0),
        }
    }

    /// Record whether the next struct slot is present. Children are filled
    /// separately.
    pub fn append(&mut self, present: bool) {
        self.validity.append(present);
    }

    /// Null slot; every child receives a null so lengths stay aligned.
    pub fn append_null(&mut self) {
        self.validity.append(false);
        for child in &mut self.children {
            child.append_null();
        }
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn children(&self) -> &[ColumnBuilder] {
        &self.children
    }

    pub(crate) fn parts_mut(&mut self) -> (&Fields, &mut [ColumnBuilder]) {
        (&self.fields, &mut self.children)
    }

    pub fn len(&self) -> usize {
        self.validity.len()
    }

    pub fn finish(&mut self) -> Result<ArrayRef, EncodeError> {
        let arrays = self
            .children
            .iter_mut()
            .map(ColumnBuilder::finish)
            .collect::<Result<Vec<_>, _>>()?;
        let nulls = finish_validity(&mut self.validity);
        let array = StructArray::try_new(self.fields.clone(), arrays, nulls)
            .map_err(|e| EncodeError::Writer(format!("struct column: {e}")))?;
        Ok(Arc::new(array))
    }
}

pub struct ListColumn {
    item: FieldRef,
    values: Box<ColumnBuilder>,
    offsets: Vec<i32>,
    validity: BooleanBufferBuilder,
    pending: i32,
}

impl ListColumn {
    pub fn new(field: &FieldSchema, timestamps: TimestampText) -> Self {
        Self {
            item: Arc::new(item_field(field)),
            values: Box::new(ColumnBuilder::for_element(field, timestamps)),
            offsets: vec![0],
            validity: BooleanBufferBuilder::new(0),
            pending: 0,
        }
    }

    /// Count one element of the open list slot. The element itself goes
    /// into [`ListColumn::values_mut`].
    pub fn append_element(&mut self) {
        self.pending += 1;
    }

    /// Close the open slot with every element counted since the last close.
    pub fn close(&mut self, valid: bool) {
        let start = self.offsets.last().copied().unwrap_or(0);
        self.offsets.push(start + self.pending);
        self.pending = 0;
        self.validity.append(valid);
    }

    pub fn append_null(&mut self) {
        self.close(false);
    }

    pub fn values(&self) -> &ColumnBuilder {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut ColumnBuilder {
        &mut self.values
    }

    pub fn offsets(&self) -> &[i32] {
        &self.offsets
    }

    pub fn len(&self) -> usize {
        self.validity.len()
    }

    pub fn finish(&mut self) -> Result<ArrayRef, EncodeError> {
        let values = self.values.finish()?;
        let offsets = std::mem::replace(&mut self.offsets, vec![0]);
        self.pending = 0;
        let nulls = finish_validity(&mut self.validity);
        let array = ListArray::try_new(
            self.item.clone(),
            OffsetBuffer::new(ScalarBuffer::from(offsets)),
            values,
            nulls,
        )
        .map_err(|e| EncodeError::Writer(format!("list column: {e}")))?;
        Ok(Arc::new(array))
    }
}

fn finish_validity(validity: &mut BooleanBufferBuilder) -> Option<NullBuffer> {
    Some(NullBuffer::new(validity.finish())).filter(|n| n.null_count() > 0)
}

// ═══════════════════════════════════════════════════════════════
//  Column tree
// ═══════════════════════════════════════════════════════════════

/// Builder tree node shaped like one field.
pub enum ColumnBuilder {
    Scalar(ScalarBuilder),
    Struct(StructColumn),
    List(ListColumn),
}

impl ColumnBuilder {
    /// Pre-shaped subtree: list for REPEATED, struct for RECORD, scalar
    /// otherwise.
    pub fn for_field(field: &FieldSchema, timestamps: TimestampText) -> Self {
        if field.is_repeated() {
            ColumnBuilder::List(ListColumn::new(field, timestamps))
        } else {
            Self::for_element(field, timestamps)
        }
    }

    fn for_element(field: &FieldSchema, timestamps: TimestampText) -> Self {
        if field.field_type.is_record() {
            ColumnBuilder::Struct(StructColumn::new(&field.fields, timestamps))
        } else {
            ColumnBuilder::Scalar(ScalarBuilder::for_type(field.field_type, timestamps))
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ColumnBuilder::Scalar(_) => "scalar",
            ColumnBuilder::Struct(_) => "struct",
            ColumnBuilder::List(_) => "list",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnBuilder::Scalar(b) => b.len(),
            ColumnBuilder::Struct(b) => b.len(),
            ColumnBuilder::List(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Null-append primitive of whichever builder this is.
    pub fn append_null(&mut self) {
        match self {
            ColumnBuilder::Scalar(b) => b.append_null(),
            ColumnBuilder::Struct(b) => b.append_null(),
            ColumnBuilder::List(b) => b.append_null(),
        }
    }

    /// Drain into an array; the builder is empty and reusable afterwards.
    pub fn finish(&mut self) -> Result<ArrayRef, EncodeError> {
        match self {
            ColumnBuilder::Scalar(b) => Ok(b.finish()),
            ColumnBuilder::Struct(b) => b.finish(),
            ColumnBuilder::List(b) => b.finish(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Record builder
// ═══════════════════════════════════════════════════════════════

/// Top-level builder of a record batch, one column per schema field.
pub struct RecordBuilder {
    schema: SchemaRef,
    columns: Vec<ColumnBuilder>,
    rows: usize,
}

impl RecordBuilder {
    pub fn new(fields: &[FieldSchema], timestamps: TimestampText) -> Self {
        let columns = fields
            .iter()
            .map(|f| ColumnBuilder::for_field(f, timestamps))
            .collect();
        Self::from_columns(fields, columns)
    }

    /// Wrap caller-assembled columns. Their shape is checked on append.
    pub fn from_columns(fields: &[FieldSchema], columns: Vec<ColumnBuilder>) -> Self {
        Self {
            schema: Arc::new(arrow_schema(fields)),
            columns,
            rows: 0,
        }
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn columns(&self) -> &[ColumnBuilder] {
        &self.columns
    }

    /// Rows fully appended since the last finish.
    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub(crate) fn parts_mut(&mut self) -> (&Fields, &mut [ColumnBuilder]) {
        (self.schema.fields(), &mut self.columns)
    }

    pub(crate) fn row_appended(&mut self) {
        self.rows += 1;
    }

    /// Drain every column into a batch. The row count is explicit so a
    /// schema without columns still yields a batch.
    pub fn finish(&mut self) -> Result<RecordBatch, EncodeError> {
        let row_count = self.columns.first().map_or(self.rows, ColumnBuilder::len);
        let arrays = self
            .columns
            .iter_mut()
            .map(ColumnBuilder::finish)
            .collect::<Result<Vec<_>, _>>()?;
        self.rows = 0;
        let options = RecordBatchOptions::new().with_row_count(Some(row_count));
        RecordBatch::try_new_with_options(self.schema.clone(), arrays, &options)
            .map_err(|e| EncodeError::Writer(format!("record batch: {e}")))
    }
}
