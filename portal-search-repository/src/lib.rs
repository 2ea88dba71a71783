//! # Portal Search Repository
//!
//! Traits and implementations for the indexer's collaborators: the portal's
//! metadata catalog and entity records (PostgreSQL or in-memory) and the search
//! index the assembled documents are written to (OpenSearch).

pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod opensearch;
pub mod postgres;
pub mod types;
pub mod utils;

pub use errors::{SearchIndexError, StoreError};
pub use interfaces::{EntityStore, MetadataCatalogStore, SearchIndexProvider};
pub use memory::InMemoryStore;
pub use opensearch::OpenSearchProvider;
pub use postgres::PostgresStore;
pub use types::{BatchOperationResult, BatchOperationSummary, DeleteDocumentRequest, ParameterUsage};
pub use utils::validate_field_name;
