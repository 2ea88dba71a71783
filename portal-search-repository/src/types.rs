//! Request and response types for store and search index operations.

use portal_search_shared::{document_id, EntityKind, ParameterDefinition};

use crate::errors::SearchIndexError;

/// A parameter definition together with how many values of it are stored for its kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterUsage {
    pub definition: ParameterDefinition,
    pub value_count: u64,
}

impl ParameterUsage {
    pub fn new(definition: ParameterDefinition, value_count: u64) -> Self {
        Self {
            definition,
            value_count,
        }
    }
}

/// Request to delete an entity's document from the search index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteDocumentRequest {
    pub kind: EntityKind,
    pub id: i64,
}

impl DeleteDocumentRequest {
    pub fn new(kind: EntityKind, id: i64) -> Self {
        Self { kind, id }
    }

    pub fn document_id(&self) -> String {
        document_id(self.kind, self.id)
    }
}

/// Result of a batch operation for a single item.
///
/// This struct represents the outcome of a single operation within a batch (indexing
/// or deleting one document). It indicates whether the operation succeeded and
/// includes error details if it failed.
#[derive(Debug, Clone)]
pub struct BatchOperationResult {
    /// The document ID, e.g. `datafile.12`.
    pub document_id: String,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error if the operation failed.
    pub error: Option<SearchIndexError>,
}

/// Summary of a batch operation containing aggregate statistics and individual results.
///
/// This allows callers to handle partial failures gracefully.
#[derive(Debug, Clone)]
pub struct BatchOperationSummary {
    /// Total number of items in the batch.
    pub total: usize,
    /// Number of successful operations.
    pub succeeded: usize,
    /// Number of failed operations.
    pub failed: usize,
    /// Individual results for each item.
    pub results: Vec<BatchOperationResult>,
}

impl BatchOperationSummary {
    /// Build a summary from individual results.
    pub fn from_results(results: Vec<BatchOperationResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }
}
