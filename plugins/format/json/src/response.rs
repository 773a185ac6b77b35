use serde::{Deserialize, Serialize, Serializer};

use emu_api::{Row, Schema};

/// Field list wrapper as it appears in responses.
pub type TableSchema = Schema;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReference {
    pub project_id: String,
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl JobReference {
    pub fn new(project_id: impl Into<String>, job_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            job_id: job_id.into(),
            location: None,
        }
    }
}

/// Body of a synchronous query call.
///
/// `total_bytes` is accounting for the caller and never serialized.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub job_reference: JobReference,
    pub schema: TableSchema,
    pub rows: Vec<Row>,
    #[serde(serialize_with = "decimal_string")]
    pub total_rows: u64,
    pub job_complete: bool,
    #[serde(skip)]
    pub total_bytes: u64,
}

impl QueryResponse {
    pub fn new(job_reference: JobReference, schema: TableSchema, rows: Vec<Row>) -> Self {
        let (total_rows, total_bytes) = totals(&rows);
        Self {
            job_reference,
            schema,
            rows,
            total_rows,
            job_complete: true,
            total_bytes,
        }
    }
}

/// Body of a `getQueryResults` call. Same wire shape as [`QueryResponse`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetQueryResultsResponse {
    pub job_reference: JobReference,
    pub schema: TableSchema,
    pub rows: Vec<Row>,
    #[serde(serialize_with = "decimal_string")]
    pub total_rows: u64,
    pub job_complete: bool,
    #[serde(skip)]
    pub total_bytes: u64,
}

impl From<QueryResponse> for GetQueryResultsResponse {
    fn from(r: QueryResponse) -> Self {
        Self {
            job_reference: r.job_reference,
            schema: r.schema,
            rows: r.rows,
            total_rows: r.total_rows,
            job_complete: r.job_complete,
            total_bytes: r.total_bytes,
        }
    }
}

/// Page of a table listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDataList {
    pub rows: Vec<Row>,
    #[serde(serialize_with = "decimal_string")]
    pub total_rows: u64,
}

impl TableDataList {
    pub fn new(rows: Vec<Row>) -> Self {
        let total_rows = rows.len() as u64;
        Self { rows, total_rows }
    }
}

fn totals(rows: &[Row]) -> (u64, u64) {
    let bytes = rows.iter().map(Row::byte_size).sum::<usize>();
    (rows.len() as u64, bytes as u64)
}

fn decimal_string<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}
