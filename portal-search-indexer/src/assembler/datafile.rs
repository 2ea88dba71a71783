use std::sync::Arc;

use async_trait::async_trait;
use portal_search_repository::{EntityStore, StoreError};
use portal_search_shared::{Document, EntityKind, IndexSchema};
use tracing::instrument;

use super::{add_experiment_stored_fields, add_parameter_fields, DocumentAssembler};
use crate::errors::AssemblyError;

/// Assembles datafile documents.
///
/// The free text is the filename. The owning dataset and experiment are copied
/// into stored fields so search results can be displayed without further lookups.
pub struct DatafileAssembler {
    store: Arc<dyn EntityStore>,
}

impl DatafileAssembler {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DocumentAssembler for DatafileAssembler {
    fn kind(&self) -> EntityKind {
        EntityKind::Datafile
    }

    #[instrument(skip(self, schema))]
    async fn assemble(&self, id: i64, schema: &IndexSchema) -> Result<Document, AssemblyError> {
        let kind = EntityKind::Datafile;
        let store_error = |e: StoreError| AssemblyError::store(kind, id, e);

        let datafile = self.store.datafile(id).await.map_err(store_error)?;
        let dataset = self
            .store
            .dataset(datafile.dataset_id)
            .await
            .map_err(store_error)?;
        let experiment = self
            .store
            .experiment(dataset.experiment_id)
            .await
            .map_err(store_error)?;

        let mut document = Document::new(kind, id, datafile.filename.as_str());
        document.set("datafile_filename", datafile.filename);
        document.set("dataset_id_stored", dataset.id);
        document.set("dataset_description_stored", dataset.description);
        add_experiment_stored_fields(&mut document, &experiment);

        add_parameter_fields(self.store.as_ref(), schema, &mut document).await?;

        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::fixtures::populated_store;
    use portal_search_repository::InMemoryStore;
    use portal_search_shared::{DatafileRecord, FieldValue};

    #[tokio::test]
    async fn test_assemble_datafile() {
        let assembler = DatafileAssembler::new(populated_store());
        let schema = IndexSchema::without_parameters(EntityKind::Datafile);

        let document = assembler.assemble(3, &schema).await.unwrap();

        assert_eq!(document.text(), "scan_001.nxs");
        assert_eq!(document.document_id(), "datafile.3");
        assert_eq!(
            document.get("datafile_filename"),
            Some(&FieldValue::Text("scan_001.nxs".to_string()))
        );
        assert_eq!(document.get("dataset_id_stored"), Some(&FieldValue::Integer(2)));
        assert_eq!(
            document.get("dataset_description_stored"),
            Some(&FieldValue::Text("Beamtime run".to_string()))
        );
        assert_eq!(
            document.get("experiment_title_stored"),
            Some(&FieldValue::Text("Neutron Study".to_string()))
        );
        assert_eq!(document.get("experiment_start_time_stored"), Some(&FieldValue::Null));
        assert_eq!(document.get("datafile_energy"), Some(&FieldValue::Number(12.5)));
    }

    #[tokio::test]
    async fn test_assemble_is_idempotent() {
        let assembler = DatafileAssembler::new(populated_store());
        let schema = IndexSchema::without_parameters(EntityKind::Datafile);

        let first = assembler.assemble(3, &schema).await.unwrap();
        let second = assembler.assemble(3, &schema).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_missing_dataset_aborts() {
        let store = Arc::new(InMemoryStore::new());
        store.insert_datafile(DatafileRecord {
            id: 9,
            dataset_id: 99,
            filename: "orphan.h5".to_string(),
        });
        let assembler = DatafileAssembler::new(store);

        let err = assembler
            .assemble(9, &IndexSchema::without_parameters(EntityKind::Datafile))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AssemblyError::NotFound {
                kind: EntityKind::Datafile,
                id: 9,
                missing_kind: EntityKind::Dataset,
                missing_id: 99,
            }
        ));
    }
}
