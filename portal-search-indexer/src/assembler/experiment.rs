use std::sync::Arc;

use async_trait::async_trait;
use portal_search_repository::{EntityStore, StoreError};
use portal_search_shared::{Document, EntityKind, IndexSchema};
use tracing::{info, instrument};

use super::{add_parameter_fields, DocumentAssembler};
use crate::errors::AssemblyError;
use crate::extract::{extract, stringify};

/// Experiment parameters whose values are also added to the free-text field.
pub const FREE_TEXT_SOFT_PARAMETERS: [&str; 2] = ["beamline", "EPN"];

/// Assembles experiment documents.
///
/// The free text joins, in order and separated by single spaces: title,
/// description, institution name, the values of [`FREE_TEXT_SOFT_PARAMETERS`]
/// present on the experiment, then every author name in stored order. Empty parts
/// are left out.
pub struct ExperimentAssembler {
    store: Arc<dyn EntityStore>,
}

impl ExperimentAssembler {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Free-text contributions of the soft parameters, in allow-list order.
    async fn soft_parameter_text(&self, id: i64) -> Result<Vec<String>, StoreError> {
        let mut parts = Vec::new();

        for name in FREE_TEXT_SOFT_PARAMETERS {
            match self.store.find_searchable_parameter(id, name).await? {
                Some(value) => parts.extend(stringify(&extract(&value))),
                None => info!(
                    experiment_id = id,
                    parameter = name,
                    "Free-text parameter not set on experiment"
                ),
            }
        }

        Ok(parts)
    }
}

#[async_trait]
impl DocumentAssembler for ExperimentAssembler {
    fn kind(&self) -> EntityKind {
        EntityKind::Experiment
    }

    #[instrument(skip(self, schema))]
    async fn assemble(&self, id: i64, schema: &IndexSchema) -> Result<Document, AssemblyError> {
        let kind = EntityKind::Experiment;
        let store_error = |e: StoreError| AssemblyError::store(kind, id, e);

        let experiment = self.store.experiment(id).await.map_err(store_error)?;
        let authors = self
            .store
            .experiment_authors(id)
            .await
            .map_err(store_error)?;
        let soft_parameters = self.soft_parameter_text(id).await.map_err(store_error)?;

        let text = [
            experiment.title.as_str(),
            experiment.description.as_str(),
            experiment.institution_name.as_str(),
        ]
        .into_iter()
        .chain(soft_parameters.iter().map(String::as_str))
        .chain(authors.iter().map(String::as_str))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        let mut document = Document::new(kind, id, text);
        document.set("experiment_id_stored", experiment.id);
        document.set("experiment_title", experiment.title);
        document.set("experiment_description", experiment.description);
        document.set("experiment_institution_name", experiment.institution_name);
        document.set("experiment_creator", experiment.created_by);
        document.set("experiment_created_time", experiment.created_time);
        document.set("experiment_start_time", experiment.start_time);
        document.set("experiment_end_time", experiment.end_time);
        document.set("experiment_update_time", experiment.update_time);
        document.set("experiment_authors", authors);

        add_parameter_fields(self.store.as_ref(), schema, &mut document).await?;

        Ok(document)
    }
}
