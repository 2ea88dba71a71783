//! Portal store error types.

use portal_search_shared::EntityKind;
use thiserror::Error;

/// SQLSTATE reported by PostgreSQL when a relation does not exist.
const UNDEFINED_TABLE: &str = "42P01";

/// Errors from reading the metadata catalog or entity records.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The backing store cannot be used yet: unreachable, or its tables are not migrated.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The requested entity does not exist.
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: i64 },

    /// Query failed for any other reason.
    #[error("Database error: {0}")]
    Database(String),

    /// A row could not be decoded into a record.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl StoreError {
    /// Create an unavailable error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create a not found error.
    pub fn not_found(kind: EntityKind, id: i64) -> Self {
        Self::NotFound { kind, id }
    }

    /// Create a database error.
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNDEFINED_TABLE) => {
                Self::Unavailable(err.to_string())
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Configuration(_) => Self::Unavailable(err.to_string()),
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::Decode(_) => Self::Decode(err.to_string()),
            _ => Self::Database(err.to_string()),
        }
    }
}
