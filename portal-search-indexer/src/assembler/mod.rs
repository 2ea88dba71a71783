//! Document assemblers.
//!
//! One assembler per entity kind turns an entity id into a [`Document`]: the kind's
//! fixed fields, one field per searchable parameter value attached to the entity,
//! and the synthesized free-text field. Assemblers are stateless; the schema
//! snapshot is passed in with every call.

mod datafile;
mod dataset;
mod experiment;
mod registry;

#[cfg(test)]
pub(crate) mod fixtures;

pub use datafile::DatafileAssembler;
pub use dataset::DatasetAssembler;
pub use experiment::{ExperimentAssembler, FREE_TEXT_SOFT_PARAMETERS};
pub use registry::AssemblerRegistry;

use async_trait::async_trait;
use portal_search_repository::EntityStore;
use portal_search_shared::{Document, EntityKind, ExperimentRecord, IndexSchema};
use tracing::debug;

use crate::errors::AssemblyError;
use crate::extract::extract;

/// Builds the search document of one entity kind.
#[async_trait]
pub trait DocumentAssembler: Send + Sync {
    /// The entity kind this assembler handles.
    fn kind(&self) -> EntityKind;

    /// Assemble the document of entity `id` against `schema`.
    ///
    /// Reads only the entity, its ancestors and its parameter values. Any store
    /// failure aborts this document.
    async fn assemble(&self, id: i64, schema: &IndexSchema) -> Result<Document, AssemblyError>;
}

/// Add one field per searchable parameter value attached to the entity.
///
/// Parameters that are not in the schema snapshot yet are still emitted; the
/// index mapping catches up on the next schema refresh.
async fn add_parameter_fields(
    store: &dyn EntityStore,
    schema: &IndexSchema,
    document: &mut Document,
) -> Result<(), AssemblyError> {
    let kind = document.kind;
    let id = document.id;
    let values = store
        .searchable_parameters(kind, id)
        .await
        .map_err(|e| AssemblyError::store(kind, id, e))?;

    for value in &values {
        let field_name = kind.field_name(&value.definition.name);
        if !schema.parameters.contains(&field_name) {
            debug!(
                kind = %kind,
                id = id,
                field = %field_name,
                "Parameter not in schema snapshot, pending schema refresh"
            );
        }
        document.set(field_name, extract(value));
    }

    Ok(())
}

/// Stored copies of the parent experiment, shared by dataset and datafile documents.
fn add_experiment_stored_fields(document: &mut Document, experiment: &ExperimentRecord) {
    document.set("experiment_id_stored", experiment.id);
    document.set("experiment_title_stored", experiment.title.as_str());
    document.set("experiment_description_stored", experiment.description.as_str());
    document.set("experiment_created_time_stored", experiment.created_time);
    document.set("experiment_start_time_stored", experiment.start_time);
    document.set("experiment_end_time_stored", experiment.end_time);
    document.set(
        "experiment_institution_name_stored",
        experiment.institution_name.as_str(),
    );
    document.set("experiment_update_time_stored", experiment.update_time);
}
