//! # Portal Search Indexer
//!
//! Search indexer for the research data portal. Experiments, datasets and
//! datafiles are assembled into search documents whose parameter fields are
//! discovered at runtime from the portal's parameter catalog, and indexed into
//! OpenSearch as entity change events arrive from Kafka.
//!
//! ## Architecture
//!
//! The indexer follows the Consumer-Processor-Loader pattern:
//!
//! 1. **Consumer**: Receives entity change events from Kafka
//! 2. **Processor**: Assembles documents against the current schema snapshot
//! 3. **Loader**: Indexes documents into OpenSearch
//! 4. **Orchestrator**: Coordinates the ingest flow and schema refreshes
//!
//! ## Modules
//!
//! - [`catalog`]: Searchable parameter definitions per entity kind
//! - [`schema`]: Field schemas built from the catalog
//! - [`extract`]: Value classification and extraction
//! - [`assembler`]: One document assembler per entity kind
//! - [`config`]: Configuration and dependency initialization
//! - [`consumer`]: Kafka consumer for entity events
//! - [`processor`]: Transforms events into documents
//! - [`loader`]: Indexes documents into OpenSearch
//! - [`orchestrator`]: Coordinates the ingest flow
//! - [`errors`]: Error types for the indexer

pub mod assembler;
pub mod catalog;
pub mod config;
pub mod consumer;
pub mod errors;
pub mod extract;
pub mod loader;
pub mod orchestrator;
pub mod processor;
pub mod schema;

pub use config::Dependencies;
pub use errors::{AssemblyError, IngestError};

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Ingest error.
    #[error("Ingest error: {0}")]
    IngestError(#[from] IngestError),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
