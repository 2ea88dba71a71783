use std::sync::Arc;

use chrono::{TimeZone, Utc};
use portal_search_repository::InMemoryStore;
use portal_search_shared::{
    DatafileRecord, DatasetRecord, EntityKind, ExperimentRecord, ParameterDataType,
    ParameterDefinition, ParameterValue,
};

pub(crate) fn experiment(id: i64) -> ExperimentRecord {
    ExperimentRecord {
        id,
        title: "Neutron Study".to_string(),
        description: "desc".to_string(),
        institution_name: "ANSTO".to_string(),
        created_by: "alice".to_string(),
        created_time: Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap(),
        start_time: None,
        end_time: None,
        update_time: Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap(),
    }
}

pub(crate) fn definition(
    name: &str,
    kind: EntityKind,
    data_type: ParameterDataType,
) -> ParameterDefinition {
    ParameterDefinition::new(name, kind, data_type, true)
}

/// Experiment 1 with authors Alice and Bob and `beamline = "BL-4"`, dataset 2
/// "Beamtime run", datafile 3 "scan_001.nxs" with `energy = 12.5`.
pub(crate) fn populated_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());

    store.insert_experiment(experiment(1));
    store.add_author(1, "Alice");
    store.add_author(1, "Bob");
    store.attach_parameter(
        1,
        ParameterValue::string(
            definition("beamline", EntityKind::Experiment, ParameterDataType::String),
            "BL-4",
        ),
    );

    store.insert_dataset(DatasetRecord {
        id: 2,
        experiment_id: 1,
        description: "Beamtime run".to_string(),
    });

    store.insert_datafile(DatafileRecord {
        id: 3,
        dataset_id: 2,
        filename: "scan_001.nxs".to_string(),
    });
    store.attach_parameter(
        3,
        ParameterValue::numeric(
            definition("energy", EntityKind::Datafile, ParameterDataType::Numeric),
            12.5,
        ),
    );

    store
}
