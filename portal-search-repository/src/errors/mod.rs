//! Error types for the search indexer repository.
//!
//! `SearchIndexError` covers search index operations, `StoreError` covers reads
//! from the portal database.

mod search_index_error;
mod store_error;

pub use search_index_error::SearchIndexError;
pub use store_error::StoreError;
