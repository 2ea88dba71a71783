//! Table names of the portal schema.

use portal_search_shared::EntityKind;

pub const EXPERIMENT: &str = "tardis_portal_experiment";
pub const DATASET: &str = "tardis_portal_dataset";
pub const DATAFILE: &str = "tardis_portal_dataset_file";
pub const AUTHOR_EXPERIMENT: &str = "tardis_portal_author_experiment";
pub const PARAMETER_NAME: &str = "tardis_portal_parametername";
pub const USER: &str = "auth_user";

/// Where the parameters of one entity kind are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterTables {
    pub entity: &'static str,
    pub parameter: &'static str,
    pub parameter_set: &'static str,
    /// Column of the parameter set referencing the entity.
    pub entity_column: &'static str,
}

pub fn parameter_tables(kind: EntityKind) -> ParameterTables {
    match kind {
        EntityKind::Experiment => ParameterTables {
            entity: EXPERIMENT,
            parameter: "tardis_portal_experimentparameter",
            parameter_set: "tardis_portal_experimentparameterset",
            entity_column: "experiment_id",
        },
        EntityKind::Dataset => ParameterTables {
            entity: DATASET,
            parameter: "tardis_portal_datasetparameter",
            parameter_set: "tardis_portal_datasetparameterset",
            entity_column: "dataset_id",
        },
        EntityKind::Datafile => ParameterTables {
            entity: DATAFILE,
            parameter: "tardis_portal_datafileparameter",
            parameter_set: "tardis_portal_datafileparameterset",
            entity_column: "dataset_file_id",
        },
    }
}
