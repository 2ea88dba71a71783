use std::sync::Arc;

use portal_search_repository::EntityStore;
use portal_search_shared::{Document, EntityKind};

use super::{DatafileAssembler, DatasetAssembler, DocumentAssembler, ExperimentAssembler};
use crate::errors::AssemblyError;
use crate::schema::SchemaSet;

/// The assembler of every entity kind, over one shared store.
pub struct AssemblerRegistry {
    experiment: ExperimentAssembler,
    dataset: DatasetAssembler,
    datafile: DatafileAssembler,
}

impl AssemblerRegistry {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            experiment: ExperimentAssembler::new(Arc::clone(&store)),
            dataset: DatasetAssembler::new(Arc::clone(&store)),
            datafile: DatafileAssembler::new(store),
        }
    }

    pub fn get(&self, kind: EntityKind) -> &dyn DocumentAssembler {
        match kind {
            EntityKind::Experiment => &self.experiment,
            EntityKind::Dataset => &self.dataset,
            EntityKind::Datafile => &self.datafile,
        }
    }

    /// Assemble the document of `kind` `id` against the kind's schema in `schemas`.
    pub async fn assemble(
        &self,
        kind: EntityKind,
        id: i64,
        schemas: &SchemaSet,
    ) -> Result<Document, AssemblyError> {
        let schema = schemas.get(kind);
        self.get(kind).assemble(id, &schema).await
    }
}
