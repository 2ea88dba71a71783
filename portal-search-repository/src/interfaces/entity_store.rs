//! Entity store trait definition.

use async_trait::async_trait;
use portal_search_shared::{
    DatafileRecord, DatasetRecord, EntityKind, ExperimentRecord, ParameterValue,
};

use crate::errors::StoreError;

/// Read access to experiments, datasets, datafiles and their parameters.
///
/// Lookups of a single record return [`StoreError::NotFound`] when the record does
/// not exist. Consistency between calls (e.g. not observing a half-written
/// parameter set) is the implementation's responsibility.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn experiment(&self, id: i64) -> Result<ExperimentRecord, StoreError>;

    async fn dataset(&self, id: i64) -> Result<DatasetRecord, StoreError>;

    async fn datafile(&self, id: i64) -> Result<DatafileRecord, StoreError>;

    /// Author names of an experiment, in their stored order.
    async fn experiment_authors(&self, experiment_id: i64) -> Result<Vec<String>, StoreError>;

    /// Every value of a searchable parameter attached to the entity.
    async fn searchable_parameters(
        &self,
        kind: EntityKind,
        id: i64,
    ) -> Result<Vec<ParameterValue>, StoreError>;

    /// The searchable parameter named `name` attached to an experiment, if any.
    ///
    /// A missing parameter is `Ok(None)`, not an error. So is a parameter with
    /// several values on the experiment, since none of them is the value.
    async fn find_searchable_parameter(
        &self,
        experiment_id: i64,
        name: &str,
    ) -> Result<Option<ParameterValue>, StoreError>;

    /// Ids of every entity of `kind`, ascending.
    async fn list_ids(&self, kind: EntityKind) -> Result<Vec<i64>, StoreError>;
}
