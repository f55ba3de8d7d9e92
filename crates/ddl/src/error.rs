//! Error types for statement rendering

use thiserror::Error;

/// Errors raised while validating a spec or rendering a statement.
///
/// These are caller bugs or invalid desired state. They are always raised
/// before any SQL reaches the control plane.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A qualified name was requested with no parts
    #[error("qualified name requires at least one part")]
    EmptyQualifiedName,

    /// A required field is missing or empty
    #[error("{object} requires `{field}`")]
    MissingField {
        object: &'static str,
        field: &'static str,
    },

    /// A field belonging to another kind was populated
    #[error("`{field}` is not valid for a {kind} {object}")]
    KindMismatch {
        object: &'static str,
        kind: &'static str,
        field: &'static str,
    },

    /// A field holds a value the statement grammar cannot carry
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Result type for statement rendering
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn missing(object: &'static str, field: &'static str) -> Self {
        Self::MissingField { object, field }
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}
