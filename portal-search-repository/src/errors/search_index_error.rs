//! Search index error types.

use thiserror::Error;

/// Errors from the OpenSearch indexes behind [`crate::SearchIndexProvider`].
#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    /// A document id or field name was rejected before reaching the backend.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The backend could not be reached.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Writing a document, alone or in bulk, failed.
    #[error("Index error: {0}")]
    IndexError(String),

    #[error("Delete error: {0}")]
    DeleteError(String),

    /// Creating a kind's versioned index or its alias failed.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// Adding parameter fields to an existing index mapping failed.
    #[error("Mapping error: {0}")]
    MappingError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl SearchIndexError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    pub fn index(msg: impl Into<String>) -> Self {
        Self::IndexError(msg.into())
    }

    pub fn delete(msg: impl Into<String>) -> Self {
        Self::DeleteError(msg.into())
    }

    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    pub fn mapping(msg: impl Into<String>) -> Self {
        Self::MappingError(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Whether retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionError(_))
    }
}
