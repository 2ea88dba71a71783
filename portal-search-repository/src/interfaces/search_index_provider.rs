//! Search index provider trait definition.
//!
//! This module defines the abstract interface for search index operations,
//! allowing for different backend implementations (OpenSearch, Elasticsearch, etc.).

use async_trait::async_trait;
use portal_search_shared::{Document, IndexSchema};

use crate::errors::SearchIndexError;
use crate::types::{BatchOperationSummary, DeleteDocumentRequest};

/// Abstracts the underlying search index implementation (OpenSearch, Elasticsearch, etc.).
///
/// This trait is the sink for assembled documents. Implementations are injected into
/// the loader to enable dependency injection and easy testing with mock implementations.
///
/// All methods return `Result<T, SearchIndexError>` for consistent error handling across
/// different backend implementations.
///
/// # Index Initialization
///
/// `ensure_index_exists` must be called for each entity kind's schema during startup,
/// and again whenever the schema is refreshed, so that dynamic parameter fields get
/// their mappings before documents carrying them arrive.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Ensure the index for `schema.kind` exists with mappings for every field of the schema.
    ///
    /// Creates the index and its alias when missing. For an existing index the mapping
    /// is extended with any new fields; existing field mappings are never changed.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the index is ready for use
    /// * `Err(SearchIndexError)` - If initialization fails
    async fn ensure_index_exists(&self, schema: &IndexSchema) -> Result<(), SearchIndexError>;

    /// Index a document, replacing any previous version of it.
    ///
    /// # Arguments
    ///
    /// * `document` - The assembled document
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the document was indexed
    /// * `Err(SearchIndexError)` - If the operation fails
    async fn index_document(&self, document: &Document) -> Result<(), SearchIndexError>;

    /// Delete a document from the search index.
    ///
    /// If the document doesn't exist, the operation is considered successful.
    async fn delete_document(&self, request: &DeleteDocumentRequest)
        -> Result<(), SearchIndexError>;

    /// Index multiple documents and return a summary of successful and failed operations.
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOperationSummary)` - Contains aggregate statistics and individual results
    /// * `Err(SearchIndexError)` - If the bulk operation fails entirely
    async fn bulk_index_documents(
        &self,
        documents: &[Document],
    ) -> Result<BatchOperationSummary, SearchIndexError>;

    /// Delete multiple documents and return a summary of successful and failed operations.
    ///
    /// Documents that don't exist are considered successful deletions.
    async fn bulk_delete_documents(
        &self,
        requests: &[DeleteDocumentRequest],
    ) -> Result<BatchOperationSummary, SearchIndexError>;
}
