use std::fmt;

/// Error returned by every encoder.
///
/// `path` locates the offending cell (`addr.lines[1].city`). Encoders build
/// it on the way out of the recursion through [`EncodeError::with_context`],
/// so leaf code creates errors with an empty path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// Cell shape does not fit the field it is paired with.
    #[error("type mismatch at '{path}': {message}")]
    TypeMismatch { path: String, message: String },

    /// Scalar text could not be parsed into the declared native type.
    #[error("cannot cast '{text}' to {type_name} at '{path}': {reason}")]
    CastFailure {
        path: String,
        type_name: String,
        text: String,
        reason: String,
    },

    /// Columnar builder tree is not shaped like the schema.
    #[error("builder shape mismatch at '{path}': expected {expected} builder, found {found}")]
    BuilderShapeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    /// Failure reported by an arrow/avro writer while finishing output.
    #[error("writer error: {0}")]
    Writer(String),

    #[error("config error: {0}")]
    Config(String),
}

impl EncodeError {
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        EncodeError::TypeMismatch {
            path: String::new(),
            message: message.into(),
        }
    }

    pub fn cast(type_name: impl fmt::Display, text: &str, reason: impl fmt::Display) -> Self {
        EncodeError::CastFailure {
            path: String::new(),
            type_name: type_name.to_string(),
            text: text.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn shape(expected: impl Into<String>, found: impl Into<String>) -> Self {
        EncodeError::BuilderShapeMismatch {
            path: String::new(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Prepend a path segment (field name, `[index]` or `rows[index]`).
    ///
    /// Variants without a path are returned unchanged.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        match self {
            EncodeError::TypeMismatch { path, message } => EncodeError::TypeMismatch {
                path: join_path(ctx, &path),
                message,
            },
            EncodeError::CastFailure {
                path,
                type_name,
                text,
                reason,
            } => EncodeError::CastFailure {
                path: join_path(ctx, &path),
                type_name,
                text,
                reason,
            },
            EncodeError::BuilderShapeMismatch {
                path,
                expected,
                found,
            } => EncodeError::BuilderShapeMismatch {
                path: join_path(ctx, &path),
                expected,
                found,
            },
            other => other,
        }
    }

    /// Location of the failing cell, if the variant carries one.
    pub fn path(&self) -> Option<&str> {
        match self {
            EncodeError::TypeMismatch { path, .. }
            | EncodeError::CastFailure { path, .. }
            | EncodeError::BuilderShapeMismatch { path, .. } => Some(path),
            _ => None,
        }
    }
}

fn join_path(ctx: impl fmt::Display, rest: &str) -> String {
    if rest.is_empty() {
        ctx.to_string()
    } else if rest.starts_with('[') {
        format!("{ctx}{rest}")
    } else {
        format!("{ctx}.{rest}")
    }
}
