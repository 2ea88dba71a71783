//! Error types for the search indexer.

use portal_search_repository::StoreError;
use portal_search_shared::EntityKind;
use thiserror::Error;

/// Errors that abort the assembly of a single document.
#[derive(Error, Debug, Clone)]
pub enum AssemblyError {
    /// The entity, or one of its ancestors, no longer exists.
    #[error("Cannot assemble {kind} {id}: {missing_kind} {missing_id} not found")]
    NotFound {
        kind: EntityKind,
        id: i64,
        missing_kind: EntityKind,
        missing_id: i64,
    },

    /// Any other failure reading from the store.
    #[error("Cannot assemble {kind} {id}: {source}")]
    Store {
        kind: EntityKind,
        id: i64,
        #[source]
        source: StoreError,
    },
}

impl AssemblyError {
    /// Wrap a store failure hit while assembling `kind` `id`.
    pub fn store(kind: EntityKind, id: i64, source: StoreError) -> Self {
        match source {
            StoreError::NotFound {
                kind: missing_kind,
                id: missing_id,
            } => Self::NotFound {
                kind,
                id,
                missing_kind,
                missing_id,
            },
            source => Self::Store { kind, id, source },
        }
    }

    /// Kind of the entity whose document could not be assembled.
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::NotFound { kind, .. } | Self::Store { kind, .. } => *kind,
        }
    }

    /// Id of the entity whose document could not be assembled.
    pub fn id(&self) -> i64 {
        match self {
            Self::NotFound { id, .. } | Self::Store { id, .. } => *id,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors that can occur in the search indexer ingest.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Error from the loader component.
    #[error("Loader error: {0}")]
    LoaderError(String),

    /// Kafka-related error.
    #[error("Kafka error: {0}")]
    KafkaError(String),

    /// Error parsing or decoding data.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Channel communication error.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// A document could not be assembled and the failure policy aborts the batch.
    #[error("Assembly error: {0}")]
    AssemblyError(#[from] AssemblyError),

    /// The orchestrator could not process a batch. Consumption stops so that no
    /// later commit moves past its offsets.
    #[error("Batch rejected: {0}")]
    BatchRejected(String),

    /// Error reading from the portal store outside of document assembly.
    #[error("Store error: {0}")]
    StoreError(String),
}

impl IngestError {
    /// Create a loader error.
    pub fn loader(msg: impl Into<String>) -> Self {
        Self::LoaderError(msg.into())
    }

    /// Create a Kafka error.
    pub fn kafka(msg: impl Into<String>) -> Self {
        Self::KafkaError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a batch rejected error.
    pub fn batch_rejected(msg: impl Into<String>) -> Self {
        Self::BatchRejected(msg.into())
    }

    /// Create a store error.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreError(msg.into())
    }
}

impl From<rdkafka::error::KafkaError> for IngestError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        Self::KafkaError(err.to_string())
    }
}

impl From<StoreError> for IngestError {
    fn from(err: StoreError) -> Self {
        Self::StoreError(err.to_string())
    }
}
