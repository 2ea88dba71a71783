//! Loader module for the search indexer ingest.
//!
//! Loads processed documents into the search index.

use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::errors::IngestError;
use crate::processor::ProcessedEvent;
use crate::schema::SchemaSet;
use portal_search_repository::{DeleteDocumentRequest, SearchIndexProvider};
use portal_search_shared::Document;

/// Configuration for the search loader.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Number of documents to batch before flushing.
    pub batch_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { batch_size: 100 }
    }
}

/// Loader that indexes documents into the search engine.
///
/// Documents are buffered and written in bulk; deletes are applied immediately.
pub struct SearchLoader {
    provider: Arc<dyn SearchIndexProvider>,
    config: LoaderConfig,
    pending_documents: Vec<Document>,
    pending_deletes: Vec<DeleteDocumentRequest>,
    /// Documents the search index accepted since creation.
    indexed: u64,
}

impl SearchLoader {
    /// Create a new search loader with the given provider.
    pub fn new(provider: Arc<dyn SearchIndexProvider>) -> Self {
        Self::with_config(provider, LoaderConfig::default())
    }

    /// Create a new search loader with custom configuration.
    pub fn with_config(provider: Arc<dyn SearchIndexProvider>, config: LoaderConfig) -> Self {
        let batch_size = config.batch_size;
        Self {
            provider,
            config,
            pending_documents: Vec::with_capacity(batch_size),
            pending_deletes: Vec::new(),
            indexed: 0,
        }
    }

    /// Create or extend the index of every entity kind for the given schemas.
    ///
    /// Must run before documents carrying new parameter fields are loaded.
    #[instrument(skip(self, schemas))]
    pub async fn ensure_indexes(&self, schemas: &SchemaSet) -> Result<(), IngestError> {
        for schema in schemas.iter() {
            self.provider
                .ensure_index_exists(schema)
                .await
                .map_err(|e| {
                    IngestError::loader(format!(
                        "Failed to ensure {} index exists: {}",
                        schema.kind, e
                    ))
                })?;
        }

        info!("Search indexes ready");
        Ok(())
    }

    /// Number of documents the search index accepted, including those from
    /// partially failed flushes.
    pub fn indexed_count(&self) -> u64 {
        self.indexed
    }

    /// Number of documents waiting to be flushed.
    pub fn pending_count(&self) -> usize {
        self.pending_documents.len()
    }

    /// Load a batch of processed events.
    ///
    /// Documents are batched and flushed when the batch size is reached.
    #[instrument(skip(self, events), fields(event_count = events.len()))]
    pub async fn load(&mut self, events: Vec<ProcessedEvent>) -> Result<(), IngestError> {
        for event in events {
            match event {
                ProcessedEvent::Index(document) => self.pending_documents.push(document),
                ProcessedEvent::Delete { kind, id } => {
                    self.pending_deletes.push(DeleteDocumentRequest::new(kind, id))
                }
            }

            if self.pending_documents.len() >= self.config.batch_size {
                self.flush().await?;
            }
        }

        // Process deletes immediately (they're usually less frequent)
        if !self.pending_deletes.is_empty() {
            self.process_deletes().await?;
        }

        Ok(())
    }

    /// Flush all pending documents to the search index.
    ///
    /// Fails if any document was rejected, so the batch is not acknowledged.
    #[instrument(skip(self))]
    pub async fn flush(&mut self) -> Result<(), IngestError> {
        if self.pending_documents.is_empty() {
            return Ok(());
        }

        let documents: Vec<Document> = self.pending_documents.drain(..).collect();
        let count = documents.len();

        debug!(count = count, "Flushing documents to search index");

        match self.provider.bulk_index_documents(&documents).await {
            Ok(summary) => {
                self.indexed += summary.succeeded as u64;
                if summary.failed == 0 {
                    debug!(count = summary.succeeded, "Successfully indexed all documents");
                    return Ok(());
                }

                warn!(
                    succeeded = summary.succeeded,
                    failed = summary.failed,
                    "Bulk index completed with some failures"
                );
                for result in summary.results.iter().filter(|r| !r.success) {
                    if let Some(ref err) = result.error {
                        error!(
                            document_id = %result.document_id,
                            error = %err,
                            "Failed to index document"
                        );
                    }
                }
                Err(IngestError::loader(format!(
                    "{} of {} documents were rejected by the search index",
                    summary.failed, count
                )))
            }
            Err(e) => {
                error!(error = %e, count = count, "Failed to bulk index documents");
                Err(IngestError::loader(format!(
                    "Failed to bulk index {} documents: {}",
                    count, e
                )))
            }
        }
    }

    /// Process pending delete operations.
    async fn process_deletes(&mut self) -> Result<(), IngestError> {
        let deletes: Vec<DeleteDocumentRequest> = self.pending_deletes.drain(..).collect();

        for request in deletes {
            if let Err(e) = self.provider.delete_document(&request).await {
                // Log but don't fail - document might not exist
                warn!(
                    document_id = %request.document_id(),
                    error = %e,
                    "Failed to delete document"
                );
            }
        }

        Ok(())
    }
}
