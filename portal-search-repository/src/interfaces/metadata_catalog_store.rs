//! Metadata catalog store trait definition.

use async_trait::async_trait;
use portal_search_shared::EntityKind;

use crate::errors::StoreError;
use crate::types::ParameterUsage;

/// Read access to the parameter-name catalog.
#[async_trait]
pub trait MetadataCatalogStore: Send + Sync {
    /// Every parameter definition used by `kind`, with its stored value count.
    ///
    /// Definitions are returned whether or not they are searchable; filtering is
    /// the caller's concern. Implementations report a store that is not reachable
    /// or not yet provisioned as [`StoreError::Unavailable`].
    async fn parameter_usage(&self, kind: EntityKind) -> Result<Vec<ParameterUsage>, StoreError>;
}
