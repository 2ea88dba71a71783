//! OpenSearch implementation of the search index provider.
//!
//! This module provides a concrete implementation of `SearchIndexProvider`
//! using OpenSearch as the backend.

mod index_config;
mod provider;

pub use index_config::{
    field_mapping, get_index_settings, get_mapping_properties, get_mappings, IndexConfig,
};
pub use provider::OpenSearchProvider;
