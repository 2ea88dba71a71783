use std::sync::Arc;

use async_trait::async_trait;
use portal_search_repository::{EntityStore, StoreError};
use portal_search_shared::{Document, EntityKind, IndexSchema};
use tracing::instrument;

use super::{add_experiment_stored_fields, add_parameter_fields, DocumentAssembler};
use crate::errors::AssemblyError;

/// Assembles dataset documents. The free text is the description.
pub struct DatasetAssembler {
    store: Arc<dyn EntityStore>,
}

impl DatasetAssembler {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DocumentAssembler for DatasetAssembler {
    fn kind(&self) -> EntityKind {
        EntityKind::Dataset
    }

    #[instrument(skip(self, schema))]
    async fn assemble(&self, id: i64, schema: &IndexSchema) -> Result<Document, AssemblyError> {
        let kind = EntityKind::Dataset;
        let store_error = |e: StoreError| AssemblyError::store(kind, id, e);

        let dataset = self.store.dataset(id).await.map_err(store_error)?;
        let experiment = self
            .store
            .experiment(dataset.experiment_id)
            .await
            .map_err(store_error)?;

        let mut document = Document::new(kind, id, dataset.description.as_str());
        document.set("dataset_description", dataset.description);
        add_experiment_stored_fields(&mut document, &experiment);

        add_parameter_fields(self.store.as_ref(), schema, &mut document).await?;

        Ok(document)
    }
}
