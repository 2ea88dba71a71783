//! Parameter catalog.
//!
//! Loads the parameter definitions that make up the dynamic part of each entity
//! kind's index schema. Only searchable definitions with at least one stored value
//! are returned; a definition nobody uses would only add an empty field mapping.

use std::sync::Arc;

use portal_search_repository::MetadataCatalogStore;
use portal_search_shared::{EntityKind, ParameterDefinition};
use tracing::{debug, warn};

/// Outcome of loading the catalog for one entity kind.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogLoad {
    Loaded(Vec<ParameterDefinition>),
    /// The catalog could not be read, e.g. because the database is not provisioned yet.
    Unavailable,
}

impl CatalogLoad {
    /// The loaded definitions, empty when the catalog was unavailable.
    pub fn definitions(&self) -> &[ParameterDefinition] {
        match self {
            Self::Loaded(definitions) => definitions,
            Self::Unavailable => &[],
        }
    }

    pub fn into_definitions(self) -> Vec<ParameterDefinition> {
        match self {
            Self::Loaded(definitions) => definitions,
            Self::Unavailable => Vec::new(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }
}

/// Reads parameter definitions from the metadata catalog store.
#[derive(Clone)]
pub struct ParameterCatalog {
    store: Arc<dyn MetadataCatalogStore>,
}

impl ParameterCatalog {
    pub fn new(store: Arc<dyn MetadataCatalogStore>) -> Self {
        Self { store }
    }

    /// Load the searchable, in-use parameter definitions of `kind`.
    ///
    /// Never fails: any store error yields [`CatalogLoad::Unavailable`], leaving the
    /// kind with its fixed fields only until the next load.
    pub async fn load(&self, kind: EntityKind) -> CatalogLoad {
        match self.store.parameter_usage(kind).await {
            Ok(usage) => {
                let total = usage.len();
                let definitions: Vec<ParameterDefinition> = usage
                    .into_iter()
                    .filter(|u| u.definition.is_searchable && u.value_count > 0)
                    .map(|u| u.definition)
                    .collect();

                debug!(
                    kind = %kind,
                    total_definitions = total,
                    searchable_definitions = definitions.len(),
                    "Loaded parameter catalog"
                );
                CatalogLoad::Loaded(definitions)
            }
            Err(e) => {
                warn!(
                    kind = %kind,
                    error = %e,
                    "Parameter catalog unavailable, indexing without parameter fields"
                );
                CatalogLoad::Unavailable
            }
        }
    }
}
