pub mod config;
pub mod error;
pub mod schema;
pub mod text;
pub mod value;

pub use config::{EncoderConfig, TimestampCompat};
pub use error::EncodeError;
pub use schema::{FieldSchema, FieldType, Mode, Schema};
pub use text::TimestampText;
pub use value::{Cell, Row, Value};
