//! In-memory store for testing and local development.
//!
//! The `InMemoryStore` implements both [`MetadataCatalogStore`] and [`EntityStore`]
//! and can be pre-populated with records and parameter values, allowing the
//! indexer to run without a database.
//!
//! # Example
//!
//! ```
//! use portal_search_repository::memory::InMemoryStore;
//! use portal_search_shared::{
//!     DatafileRecord, EntityKind, ParameterDataType, ParameterDefinition, ParameterValue,
//! };
//!
//! let store = InMemoryStore::new();
//! store.insert_datafile(DatafileRecord {
//!     id: 1,
//!     dataset_id: 1,
//!     filename: "scan_001.nxs".to_string(),
//! });
//! let energy =
//!     ParameterDefinition::new("energy", EntityKind::Datafile, ParameterDataType::Numeric, true);
//! store.attach_parameter(1, ParameterValue::numeric(energy, 12.5));
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use portal_search_shared::{
    DatafileRecord, DatasetRecord, EntityKind, ExperimentRecord, ParameterDefinition,
    ParameterValue,
};

use crate::errors::StoreError;
use crate::interfaces::{EntityStore, MetadataCatalogStore};
use crate::types::ParameterUsage;
use crate::utils::sole_value;

#[derive(Default)]
struct Inner {
    experiments: BTreeMap<i64, ExperimentRecord>,
    datasets: BTreeMap<i64, DatasetRecord>,
    datafiles: BTreeMap<i64, DatafileRecord>,
    authors: HashMap<i64, Vec<String>>,
    parameters: HashMap<(EntityKind, i64), Vec<ParameterValue>>,
    /// Definitions registered without any value.
    definitions: Vec<ParameterDefinition>,
}

/// Store holding portal records in memory.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read fail with [`StoreError::Unavailable`], as an unprovisioned database would.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn insert_experiment(&self, experiment: ExperimentRecord) {
        self.write().experiments.insert(experiment.id, experiment);
    }

    pub fn insert_dataset(&self, dataset: DatasetRecord) {
        self.write().datasets.insert(dataset.id, dataset);
    }

    pub fn insert_datafile(&self, datafile: DatafileRecord) {
        self.write().datafiles.insert(datafile.id, datafile);
    }

    /// Append an author to an experiment's author list.
    pub fn add_author(&self, experiment_id: i64, author: impl Into<String>) {
        self.write()
            .authors
            .entry(experiment_id)
            .or_default()
            .push(author.into());
    }

    /// Attach a parameter value to the entity of the definition's kind with id `entity_id`.
    pub fn attach_parameter(&self, entity_id: i64, value: ParameterValue) {
        let kind = value.definition.entity_kind;
        self.write()
            .parameters
            .entry((kind, entity_id))
            .or_default()
            .push(value);
    }

    /// Register a definition in the catalog without attaching any value to it.
    pub fn define_parameter(&self, definition: ParameterDefinition) {
        self.write().definitions.push(definition);
    }

    /// Remove an entity record and its parameter values.
    pub fn remove(&self, kind: EntityKind, id: i64) {
        let mut inner = self.write();
        match kind {
            EntityKind::Experiment => {
                inner.experiments.remove(&id);
                inner.authors.remove(&id);
            }
            EntityKind::Dataset => {
                inner.datasets.remove(&id);
            }
            EntityKind::Datafile => {
                inner.datafiles.remove(&id);
            }
        }
        inner.parameters.remove(&(kind, id));
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("in-memory store marked unavailable"));
        }
        Ok(self.inner.read().unwrap_or_else(|e| e.into_inner()))
    }
}

#[async_trait]
impl MetadataCatalogStore for InMemoryStore {
    async fn parameter_usage(&self, kind: EntityKind) -> Result<Vec<ParameterUsage>, StoreError> {
        let inner = self.read()?;
        let mut usage: BTreeMap<String, ParameterUsage> = BTreeMap::new();

        for definition in inner.definitions.iter().filter(|d| d.entity_kind == kind) {
            usage
                .entry(definition.name.clone())
                .or_insert_with(|| ParameterUsage::new(definition.clone(), 0));
        }

        for ((value_kind, _), values) in &inner.parameters {
            if *value_kind != kind {
                continue;
            }
            for value in values {
                usage
                    .entry(value.definition.name.clone())
                    .or_insert_with(|| ParameterUsage::new(value.definition.clone(), 0))
                    .value_count += 1;
            }
        }

        Ok(usage.into_values().collect())
    }
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn experiment(&self, id: i64) -> Result<ExperimentRecord, StoreError> {
        self.read()?
            .experiments
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(EntityKind::Experiment, id))
    }

    async fn dataset(&self, id: i64) -> Result<DatasetRecord, StoreError> {
        self.read()?
            .datasets
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(EntityKind::Dataset, id))
    }

    async fn datafile(&self, id: i64) -> Result<DatafileRecord, StoreError> {
        self.read()?
            .datafiles
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(EntityKind::Datafile, id))
    }

    async fn experiment_authors(&self, experiment_id: i64) -> Result<Vec<String>, StoreError> {
        Ok(self
            .read()?
            .authors
            .get(&experiment_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn searchable_parameters(
        &self,
        kind: EntityKind,
        id: i64,
    ) -> Result<Vec<ParameterValue>, StoreError> {
        Ok(self
            .read()?
            .parameters
            .get(&(kind, id))
            .map(|values| {
                values
                    .iter()
                    .filter(|v| v.definition.is_searchable)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_searchable_parameter(
        &self,
        experiment_id: i64,
        name: &str,
    ) -> Result<Option<ParameterValue>, StoreError> {
        let matches = self
            .read()?
            .parameters
            .get(&(EntityKind::Experiment, experiment_id))
            .map(|values| {
                values
                    .iter()
                    .filter(|v| v.definition.is_searchable && v.definition.name == name)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(sole_value(matches, experiment_id, name))
    }

    async fn list_ids(&self, kind: EntityKind) -> Result<Vec<i64>, StoreError> {
        let inner = self.read()?;
        let ids = match kind {
            EntityKind::Experiment => inner.experiments.keys().copied().collect(),
            EntityKind::Dataset => inner.datasets.keys().copied().collect(),
            EntityKind::Datafile => inner.datafiles.keys().copied().collect(),
        };
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_search_shared::ParameterDataType;

    fn definition(name: &str, kind: EntityKind, searchable: bool) -> ParameterDefinition {
        ParameterDefinition::new(name, kind, ParameterDataType::String, searchable)
    }

    #[tokio::test]
    async fn test_parameter_usage_counts_values() {
        let store = InMemoryStore::new();
        store.define_parameter(definition("unused", EntityKind::Dataset, true));
        store.attach_parameter(1, ParameterValue::string(definition("sample", EntityKind::Dataset, true), "a"));
        store.attach_parameter(2, ParameterValue::string(definition("sample", EntityKind::Dataset, true), "b"));
        store.attach_parameter(1, ParameterValue::string(definition("sample", EntityKind::Datafile, true), "c"));

        let usage = store.parameter_usage(EntityKind::Dataset).await.unwrap();
        assert_eq!(usage.len(), 2);
        assert_eq!(usage[0].definition.name, "sample");
        assert_eq!(usage[0].value_count, 2);
        assert_eq!(usage[1].definition.name, "unused");
        assert_eq!(usage[1].value_count, 0);
    }

    #[tokio::test]
    async fn test_searchable_parameters_filter() {
        let store = InMemoryStore::new();
        store.attach_parameter(5, ParameterValue::string(definition("public", EntityKind::Experiment, true), "x"));
        store.attach_parameter(5, ParameterValue::string(definition("hidden", EntityKind::Experiment, false), "y"));

        let values = store
            .searchable_parameters(EntityKind::Experiment, 5)
            .await
            .unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].definition.name, "public");

        assert!(store.find_searchable_parameter(5, "hidden").await.unwrap().is_none());
        assert!(store.find_searchable_parameter(5, "public").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_ambiguous_free_text_parameter_is_not_found() {
        let store = InMemoryStore::new();
        store.attach_parameter(6, ParameterValue::string(definition("beamline", EntityKind::Experiment, true), "BL-1"));
        store.attach_parameter(6, ParameterValue::string(definition("beamline", EntityKind::Experiment, true), "BL-2"));

        assert!(store.find_searchable_parameter(6, "beamline").await.unwrap().is_none());
        assert_eq!(
            store
                .searchable_parameters(EntityKind::Experiment, 6)
                .await
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn test_missing_record_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.dataset(9).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::NotFound {
                kind: EntityKind::Dataset,
                id: 9
            }
        ));
    }

    #[tokio::test]
    async fn test_unavailable_store() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);
        let err = store.parameter_usage(EntityKind::Experiment).await.unwrap_err();
        assert!(err.is_unavailable());
        assert!(store.list_ids(EntityKind::Experiment).await.is_err());
    }
}
