//! Interface definitions for the portal stores and the search index provider.
//!
//! These traits allow for dependency injection and swappable backends: the
//! indexer only ever sees `dyn MetadataCatalogStore`, `dyn EntityStore` and
//! `dyn SearchIndexProvider`.

mod entity_store;
mod metadata_catalog_store;
mod search_index_provider;

pub use entity_store::EntityStore;
pub use metadata_catalog_store::MetadataCatalogStore;
pub use search_index_provider::SearchIndexProvider;
