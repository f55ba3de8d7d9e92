//! Error types for reconciliation.
//!
//! Errors are categorized so the caller can tell a failed statement (never
//! retried) from an orphaned object (retry identity resolution, never the
//! CREATE) and from a half-applied update.

use crate::types::ObjectIdentity;
use ddl::ObjectType;
use std::fmt;

/// Result type alias for reconciliation.
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Categories of reconciliation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The spec was rejected before any SQL ran.
    Validation,
    /// The server rejected a statement.
    Statement,
    /// The object exists but its identity could not be resolved.
    Identity,
    /// Some changes of an update were applied, some were not.
    Partial,
    /// A change has no in-place path.
    Replacement,
    /// The object does not exist.
    NotFound,
    /// The database could not be reached.
    Connection,
}

impl ErrorCategory {
    /// Whether retrying the failed step (never the CREATE) may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Identity | Self::Connection)
    }

    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Validation => "Invalid object specification",
            Self::Statement => "Statement rejected by the server",
            Self::Identity => "Object identity unresolved",
            Self::Partial => "Update partially applied",
            Self::Replacement => "Change requires replacement",
            Self::NotFound => "Object not found",
            Self::Connection => "Database unreachable",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Validation => "Fix the manifest entry and run plan again",
            Self::Statement => "Check the statement and server message above",
            Self::Identity => {
                "The object was created; run apply again or import it by id, do not recreate it"
            }
            Self::Partial => "Run apply again to finish the remaining changes",
            Self::Replacement => "Apply with replacement allowed, or revert the change",
            Self::NotFound => "Verify the object id",
            Self::Connection => "Check host, port, credentials and network access",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while reconciling one object.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// The spec failed validation or rendering.
    #[error("invalid spec: {0}")]
    InvalidSpec(#[from] ddl::Error),

    /// A statement failed. Statements carrying secrets are redacted.
    #[error("statement failed: {message}\n  Statement: {statement}")]
    Sql {
        statement: String,
        message: String,
        code: Option<String>,
    },

    /// CREATE succeeded but the new object could not be found by name.
    #[error("{object_type} {name} was created but its identity could not be resolved: {reason}")]
    Orphaned {
        object_type: ObjectType,
        name: String,
        reason: String,
    },

    /// A catalog lookup matched more than one object.
    #[error("{object_type} {name} matched {rows} catalog rows")]
    AmbiguousIdentity {
        object_type: ObjectType,
        name: String,
        rows: usize,
    },

    /// An update stopped part way.
    #[error(
        "update of {id} stopped at `{failed}` after applying [{}]: {message}",
        applied.join(", ")
    )]
    PartialUpdate {
        id: ObjectIdentity,
        /// Attribute keys changed before the failure
        applied: Vec<String>,
        failed: String,
        message: String,
    },

    /// The requested update changes attributes that cannot be altered.
    #[error("changing [{}] requires replacement", attributes.join(", "))]
    ReplacementRequired { attributes: Vec<String> },

    #[error("{object_type} with id {id} does not exist")]
    NotFound {
        object_type: ObjectType,
        id: ObjectIdentity,
    },

    #[error("connection failed: {0}")]
    Connection(String),
}

impl ReconcileError {
    /// Create a statement error.
    pub fn sql(statement: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Sql {
            statement: statement.into(),
            message: message.into(),
            code: None,
        }
    }

    /// Get the error category for retry logic.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidSpec(_) => ErrorCategory::Validation,
            Self::Sql { .. } => ErrorCategory::Statement,
            Self::Orphaned { .. } => ErrorCategory::Identity,
            // Ambiguity will not resolve itself
            Self::AmbiguousIdentity { .. } => ErrorCategory::Statement,
            Self::PartialUpdate { .. } => ErrorCategory::Partial,
            Self::ReplacementRequired { .. } => ErrorCategory::Replacement,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Connection(_) => ErrorCategory::Connection,
        }
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Whether the object exists server-side without a known identity.
    #[must_use]
    pub fn is_orphan(&self) -> bool {
        matches!(self, Self::Orphaned { .. })
    }
}
