//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust crate.

use async_trait::async_trait;
use opensearch::{
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsParts, IndicesPutMappingParts},
    DeleteParts, IndexParts, OpenSearch,
};
use portal_search_shared::{Document, IndexSchema};
use tracing::{debug, error, info};
use url::Url;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::opensearch::index_config::{get_index_settings, get_mappings, IndexConfig};
use crate::types::{BatchOperationResult, BatchOperationSummary, DeleteDocumentRequest};

/// OpenSearch provider implementation.
///
/// Documents of each entity kind live in their own index, addressed through the
/// alias from [`IndexConfig::alias`].
///
/// # Example
///
/// ```ignore
/// use portal_search_repository::opensearch::{IndexConfig, OpenSearchProvider};
/// use portal_search_shared::{Document, EntityKind, IndexSchema};
///
/// let config = IndexConfig::new("tardis", 0);
/// let provider = OpenSearchProvider::new("http://localhost:9200", config).await?;
///
/// provider
///     .ensure_index_exists(&IndexSchema::without_parameters(EntityKind::Datafile))
///     .await?;
/// provider
///     .index_document(&Document::new(EntityKind::Datafile, 1, "scan_001.nxs"))
///     .await?;
/// ```
pub struct OpenSearchProvider {
    client: OpenSearch,
    index_config: IndexConfig,
}

impl OpenSearchProvider {
    /// Create a new OpenSearch provider connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `index_config` - The index configuration containing alias prefix and version
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchProvider)` - A new provider instance
    /// * `Err(SearchIndexError)` - If connection setup fails
    pub async fn new(url: &str, index_config: IndexConfig) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::validation(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            alias_prefix = %index_config.alias_prefix,
            version = index_config.version,
            "Created OpenSearch provider"
        );

        Ok(Self {
            client,
            index_config,
        })
    }

    async fn index_exists(&self, index_name: &str) -> Result<bool, SearchIndexError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index_name]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        Ok(response.status_code().is_success())
    }

    async fn create_index(&self, schema: &IndexSchema) -> Result<(), SearchIndexError> {
        let index_name = self.index_config.versioned_index_name(schema.kind);

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&index_name))
            .body(get_index_settings(&self.index_config, schema))
            .send()
            .await
            .map_err(|e| SearchIndexError::index_creation(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Create index request failed");
            return Err(SearchIndexError::index_creation(format!(
                "Create index {} failed with status {}: {}",
                index_name, status, error_body
            )));
        }

        info!(
            index = %index_name,
            alias = %self.index_config.alias(schema.kind),
            field_count = schema.fields().len(),
            "Created search index"
        );
        Ok(())
    }

    async fn put_mapping(&self, schema: &IndexSchema) -> Result<(), SearchIndexError> {
        let alias = self.index_config.alias(schema.kind);

        let response = self
            .client
            .indices()
            .put_mapping(IndicesPutMappingParts::Index(&[alias.as_str()]))
            .body(get_mappings(schema))
            .send()
            .await
            .map_err(|e| SearchIndexError::mapping(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Put mapping request failed");
            return Err(SearchIndexError::mapping(format!(
                "Put mapping on {} failed with status {}: {}",
                alias, status, error_body
            )));
        }

        debug!(
            alias = %alias,
            parameter_fields = schema.parameters.len(),
            "Index mapping extended"
        );
        Ok(())
    }
}

#[async_trait]
impl SearchIndexProvider for OpenSearchProvider {
    async fn ensure_index_exists(&self, schema: &IndexSchema) -> Result<(), SearchIndexError> {
        let index_name = self.index_config.versioned_index_name(schema.kind);

        if self.index_exists(&index_name).await? {
            self.put_mapping(schema).await
        } else {
            self.create_index(schema).await
        }
    }

    /// Index a document under its `{kind}.{id}` ID, replacing any previous version.
    async fn index_document(&self, document: &Document) -> Result<(), SearchIndexError> {
        let alias = self.index_config.alias(document.kind);
        let doc_id = document.document_id();

        let body = serde_json::to_value(&document.fields)
            .map_err(|e| SearchIndexError::serialization(e.to_string()))?;

        let response = self
            .client
            .index(IndexParts::IndexId(&alias, &doc_id))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::index(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Index request failed");
            return Err(SearchIndexError::index(format!(
                "Index failed with status {}: {}",
                status, error_body
            )));
        }

        debug!(doc_id = %doc_id, "Document indexed");
        Ok(())
    }

    /// Delete a document from the search index.
    ///
    /// If the document doesn't exist, the operation is considered successful (no error is returned).
    async fn delete_document(
        &self,
        request: &DeleteDocumentRequest,
    ) -> Result<(), SearchIndexError> {
        let alias = self.index_config.alias(request.kind);
        let doc_id = request.document_id();

        let response = self
            .client
            .delete(DeleteParts::IndexId(&alias, &doc_id))
            .send()
            .await
            .map_err(|e| SearchIndexError::delete(e.to_string()))?;

        let status = response.status_code();

        // 404 is acceptable - document may not exist
        if !status.is_success() && status.as_u16() != 404 {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Delete request failed");
            return Err(SearchIndexError::delete(format!(
                "Delete failed with status {}: {}",
                status, error_body
            )));
        }

        debug!(doc_id = %doc_id, "Document deleted");
        Ok(())
    }

    /// Index multiple documents by calling `index_document` for each one and
    /// collecting the results.
    async fn bulk_index_documents(
        &self,
        documents: &[Document],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        let mut results = Vec::with_capacity(documents.len());

        for document in documents {
            let outcome = SearchIndexProvider::index_document(self, document).await;
            results.push(BatchOperationResult {
                document_id: document.document_id(),
                success: outcome.is_ok(),
                error: outcome.err(),
            });
        }

        Ok(BatchOperationSummary::from_results(results))
    }

    async fn bulk_delete_documents(
        &self,
        requests: &[DeleteDocumentRequest],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        let mut results = Vec::with_capacity(requests.len());

        for request in requests {
            let outcome = SearchIndexProvider::delete_document(self, request).await;
            results.push(BatchOperationResult {
                document_id: request.document_id(),
                success: outcome.is_ok(),
                error: outcome.err(),
            });
        }

        Ok(BatchOperationSummary::from_results(results))
    }
}
