//! The SQL connection seam
//!
//! The reconciler only needs two operations: run a statement, and run a query
//! returning text rows. [`crate::pool::PgPool`] is the production provider.

use ddl::Row;

/// Errors raised by a [`SqlConnection`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SqlError {
    /// The server rejected the statement
    #[error("{message}")]
    Database {
        message: String,
        /// SQLSTATE
        code: Option<String>,
    },
    /// No usable connection
    #[error("{0}")]
    Connection(String),
}

impl SqlError {
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: None,
        }
    }
}

/// A blocking, thread-safe SQL connection
pub trait SqlConnection: Send + Sync {
    /// Run a statement that returns no rows
    fn execute(&self, statement: &str) -> Result<(), SqlError>;

    /// Run a query; every value comes back as text
    fn query(&self, statement: &str) -> Result<Vec<Row>, SqlError>;
}
