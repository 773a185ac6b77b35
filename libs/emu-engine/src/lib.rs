//! Request-level pipeline: timestamp normalization and channel dispatch.

pub mod normalize;
pub mod result_set;

pub use normalize::normalize;
pub use result_set::{Encoded, OutputChannel, PreparedResult, ResultSet};
